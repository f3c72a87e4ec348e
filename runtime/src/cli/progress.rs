// Copyright 2026 SocialCheck Contributors
// SPDX-License-Identifier: Apache-2.0

//! Terminal rendering of pipeline events.

use super::output;
use crate::events::{Event, EventKind, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

const TEMPLATE: &str = "  {prefix:>11} [{bar:30}] {pos}/{len} {wide_msg}";

fn bar(stage: Stage, total: usize) -> ProgressBar {
    let style = ProgressStyle::with_template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let bar = ProgressBar::new(total as u64).with_style(style);
    bar.set_prefix(stage.to_string());
    bar
}

/// Drain events until every sender is gone.
///
/// With `--json` or `--quiet` the events are consumed silently; otherwise
/// each stage gets a progress bar and problem verdicts are printed above it.
pub async fn drain(mut rx: mpsc::UnboundedReceiver<Event>) {
    let silent = output::is_json() || output::is_quiet();
    let verbose = output::is_verbose();
    let mut current: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        if silent {
            continue;
        }
        match event.kind {
            EventKind::StageStarted { stage, total } => {
                if let Some(old) = current.take() {
                    old.finish_and_clear();
                }
                current = Some(bar(stage, total));
            }
            EventKind::Progress { index, message, .. } => {
                if let Some(bar) = &current {
                    bar.set_position(index as u64);
                    bar.set_message(message);
                }
            }
            EventKind::LinkFound { source, url, platform } => {
                if verbose {
                    print_line(&current, format!("  + {platform:<10} {url}  ({source})"));
                }
            }
            EventKind::Verdict { verdict } => {
                if verdict.state.is_problem() || verbose {
                    print_line(
                        &current,
                        format!("  {:<14} {}  {}", verdict.state.label(), verdict.link.url(), verdict.evidence),
                    );
                }
            }
            EventKind::StageCompleted {
                stage,
                processed,
                elapsed_ms,
            } => {
                if let Some(bar) = current.take() {
                    bar.finish_and_clear();
                }
                eprintln!("  {stage}: {processed} done in {:.1}s", elapsed_ms as f64 / 1000.0);
            }
            EventKind::Warning { message } => {
                if verbose {
                    print_line(&current, format!("  Warning: {message}"));
                }
            }
        }
    }

    if let Some(bar) = current {
        bar.finish_and_clear();
    }
}

fn print_line(bar: &Option<ProgressBar>, line: String) {
    match bar {
        Some(bar) => bar.println(line),
        None => eprintln!("{line}"),
    }
}
