//! CLI subcommand implementations for the `socialcheck` binary.

pub mod check_cmd;
pub mod doctor;
pub mod output;
pub mod progress;
pub mod run_cmd;
pub mod scrape_cmd;
pub mod validate_cmd;

use crate::config::Config;
use crate::error::Error;
use crate::events::{self, EventEmitter};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::validator::CancelFlag;
use anyhow::{Context, Result};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Load the configuration, applying the `--config` override if given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("failed to load configuration")
}

/// Open the event channel and start draining it into the terminal.
pub fn start_events() -> (EventEmitter, JoinHandle<()>) {
    let (emitter, rx) = events::channel();
    tracing::debug!("run {}", emitter.run_id());
    (emitter, tokio::spawn(progress::drain(rx)))
}

/// Close the event channel and wait for the terminal to catch up.
pub async fn finish_events(emitter: EventEmitter, drain: JoinHandle<()>) {
    drop(emitter);
    let _ = drain.await;
}

/// Exit status after a second interrupt (128 + SIGINT).
const ABORT_EXIT_CODE: i32 = 130;

/// A cancel flag that trips on Ctrl-C. A second Ctrl-C exits immediately.
pub fn cancel_on_ctrl_c() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if wait_for_abort(tokio::signal::ctrl_c, flag).await {
            tracing::warn!("aborted");
            std::process::exit(ABORT_EXIT_CODE);
        }
    });
    cancel
}

/// Cancel `flag` on the first interrupt; resolve to `true` on the second.
async fn wait_for_abort<F, Fut>(mut interrupt: F, flag: CancelFlag) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    tracing::warn!("interrupted, finishing the current link (Ctrl-C again to abort)");
    flag.cancel();
    interrupt().await.is_ok()
}

/// Launch headless Chromium.
pub async fn launch_browser(user_agent: String) -> Result<Arc<dyn Renderer>, Error> {
    let renderer = ChromiumRenderer::launch(&user_agent).await?;
    Ok(Arc::new(renderer))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Interrupt source that delivers `n` signals, then reports no handler.
    fn interrupts(n: usize) -> impl FnMut() -> std::future::Ready<std::io::Result<()>> {
        let mut seen = 0;
        move || {
            seen += 1;
            std::future::ready(if seen <= n {
                Ok(())
            } else {
                Err(std::io::Error::other("no signal handler"))
            })
        }
    }

    #[tokio::test]
    async fn test_second_interrupt_aborts() {
        let flag = CancelFlag::new();
        assert!(wait_for_abort(interrupts(2), flag.clone()).await);
        assert!(flag.is_cancelled());
        assert_eq!(ABORT_EXIT_CODE, 130);
    }

    #[tokio::test]
    async fn test_single_interrupt_only_cancels() {
        let flag = CancelFlag::new();
        assert!(!wait_for_abort(interrupts(1), flag.clone()).await);
        assert!(flag.is_cancelled());

        let flag = CancelFlag::new();
        assert!(!wait_for_abort(interrupts(0), flag.clone()).await);
        assert!(!flag.is_cancelled());
    }
}
