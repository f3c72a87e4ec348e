//! `socialcheck check <domains-file>`: liveness only.

use super::{finish_events, load_config, output, start_events};
use crate::pipeline::Pipeline;
use crate::report;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT: &str = "checked_urls.txt";

pub async fn run(config_path: Option<&Path>, domains_file: &Path, out: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let domains = report::read_list_file(domains_file)
        .with_context(|| format!("failed to read {}", domains_file.display()))?;
    let out = out.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let pipeline = Pipeline::new(config)?;
    let (events, drain) = start_events();
    let results = pipeline.check(&domains, &events).await;
    finish_events(events, drain).await;

    report::write_reachable_file(&out, &results)
        .with_context(|| format!("failed to write {}", out.display()))?;

    let reachable = results.iter().filter(|r| r.reachable).count();
    if output::is_json() {
        output::print_json(&serde_json::json!({
            "output": out,
            "total": results.len(),
            "reachable": reachable,
            "results": results,
        }));
    } else if !output::is_quiet() {
        for r in results.iter().filter(|r| !r.reachable) {
            let reason = match (&r.status, &r.error) {
                (Some(status), _) => format!("status {status}"),
                (None, Some(e)) => e.clone(),
                (None, None) => "unreachable".to_string(),
            };
            eprintln!("  [!!] {}  {reason}", r.url);
        }
        eprintln!("  {reachable}/{} domain(s) reachable", results.len());
        eprintln!("  Written to {}", out.display());
    }
    Ok(())
}
