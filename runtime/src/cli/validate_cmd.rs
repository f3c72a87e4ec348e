//! `socialcheck validate <links-file>`: validation only.

use super::{cancel_on_ctrl_c, finish_events, launch_browser, load_config, output, start_events};
use crate::model::LinkSet;
use crate::pipeline::Pipeline;
use crate::report::{self, Summary};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub async fn run(config_path: Option<&Path>, links_file: &Path, out: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let set = LinkSet::new(config.dedup, config.required_query_params.clone());
    let links = report::read_links_file(links_file, &config.keywords, set)
        .with_context(|| format!("failed to read {}", links_file.display()))?;
    let out = out.unwrap_or_else(|| PathBuf::from(report::default_output_name(&chrono::Local::now())));

    if links.is_empty() {
        if output::is_json() {
            output::print_json(&serde_json::json!({ "verdicts": [] }));
        } else if !output::is_quiet() {
            eprintln!("  No links in {}", links_file.display());
        }
        return Ok(());
    }

    let user_agent = config.user_agent.clone();
    let pipeline = Pipeline::new(config)?;
    let renderer = launch_browser(user_agent).await?;
    let cancel = cancel_on_ctrl_c();
    let (events, drain) = start_events();

    let result = pipeline.validate(renderer, links, &events, &cancel).await;
    finish_events(events, drain).await;
    let verdicts = result?;

    report::write_verdicts_file(&out, &verdicts)
        .with_context(|| format!("failed to write {}", out.display()))?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "output": out,
            "cancelled": cancel.is_cancelled(),
            "verdicts": verdicts,
        }));
    } else if !output::is_quiet() {
        eprintln!();
        eprintln!("  {}", Summary::from_verdicts(&verdicts));
        eprintln!("  Report written to {}", out.display());
    }
    Ok(())
}
