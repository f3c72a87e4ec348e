//! `socialcheck run <domains-file>`: liveness, extraction and validation.

use super::{cancel_on_ctrl_c, finish_events, launch_browser, load_config, output, start_events};
use crate::model::DedupMode;
use crate::pipeline::Pipeline;
use crate::report::{self, Summary};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub async fn run(
    config_path: Option<&Path>,
    domains_file: &Path,
    out: Option<PathBuf>,
    all_sources: bool,
    insecure: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if all_sources {
        config.dedup = DedupMode::AllSources;
    }
    if insecure {
        config.accept_invalid_certs = true;
    }

    let domains = report::read_list_file(domains_file)
        .with_context(|| format!("failed to read {}", domains_file.display()))?;
    let out = out.unwrap_or_else(|| PathBuf::from(report::default_output_name(&chrono::Local::now())));

    let user_agent = config.user_agent.clone();
    let pipeline = Pipeline::new(config)?;
    let cancel = cancel_on_ctrl_c();
    let (events, drain) = start_events();

    let result = pipeline
        .run(&domains, || launch_browser(user_agent), &events, &cancel)
        .await;
    finish_events(events, drain).await;
    let report = result?;

    report::write_verdicts_file(&out, &report.verdicts)
        .with_context(|| format!("failed to write {}", out.display()))?;

    let summary = Summary::from_verdicts(&report.verdicts);
    if output::is_json() {
        output::print_json(&serde_json::json!({
            "output": out,
            "domains": domains.len(),
            "reachable": report.reachable(),
            "links": report.links.len(),
            "cancelled": cancel.is_cancelled(),
            "verdicts": report.verdicts,
        }));
        return Ok(());
    }

    if !output::is_quiet() {
        eprintln!();
        eprintln!(
            "  {}/{} domain(s) reachable, {} social link(s)",
            report.reachable(),
            domains.len(),
            report.links.len()
        );
        eprintln!("  {summary}");
        if cancel.is_cancelled() {
            eprintln!("  Cancelled: remaining links marked INDETERMINATE.");
        }
        eprintln!("  Report written to {}", out.display());
    }
    Ok(())
}
