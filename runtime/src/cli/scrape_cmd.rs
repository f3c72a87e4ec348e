//! `socialcheck scrape <urls-file>`: extraction only.

use super::{finish_events, load_config, output, start_events};
use crate::model::DedupMode;
use crate::pipeline::Pipeline;
use crate::report;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT: &str = "social_links.csv";

pub async fn run(
    config_path: Option<&Path>,
    urls_file: &Path,
    out: Option<PathBuf>,
    all_sources: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if all_sources {
        config.dedup = DedupMode::AllSources;
    }
    let urls: Vec<String> = report::read_list_file(urls_file)
        .with_context(|| format!("failed to read {}", urls_file.display()))?
        .iter()
        .map(|u| crate::acquisition::liveness::with_scheme(u))
        .collect();
    let out = out.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let pipeline = Pipeline::new(config)?;
    let (events, drain) = start_events();
    let links = pipeline.scrape(&urls, &events).await.into_links();
    finish_events(events, drain).await;

    report::write_links_file(&out, &links)
        .with_context(|| format!("failed to write {}", out.display()))?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "output": out,
            "pages": urls.len(),
            "links": links,
        }));
    } else if !output::is_quiet() {
        eprintln!("  {} social link(s) from {} page(s)", links.len(), urls.len());
        eprintln!("  Written to {}", out.display());
    }
    Ok(())
}
