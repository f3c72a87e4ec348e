//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Poll interval for readiness and marker waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine and terminate its process.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    ///
    /// A timeout is reported as [`crate::error::Error::RenderTimeout`] so
    /// callers can tell it apart from other navigation failures.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full page HTML, including script-generated content.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;

    /// Wait until the document has a body and is no longer loading.
    /// Returns `false` if `timeout` elapsed first.
    async fn wait_for_ready(&self, timeout: Duration) -> Result<bool> {
        self.poll_js(
            "!!document.body && document.readyState !== 'loading'",
            timeout,
        )
        .await
    }

    /// Wait until an element matching `selector` exists.
    /// Returns `false` if `timeout` elapsed first.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        self.poll_js(&script, timeout).await
    }

    /// Evaluate a boolean expression until it holds or `timeout` elapses.
    async fn poll_js(&self, expression: &str, timeout: Duration) -> Result<bool> {
        let start = Instant::now();
        loop {
            if self.execute_js(expression).await?.as_bool().unwrap_or(false) {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
        }
    }
}
