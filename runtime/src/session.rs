//! Rendering session: one long-lived browser context for a validation batch.
//!
//! The session is driven strictly sequentially. Each `navigate` produces a
//! fresh [`FetchOutcome`]; `render_snapshot` refuses to run unless the last
//! navigation succeeded, so markup from a previous link can never be read
//! for the current one.

use crate::acquisition::http_client::HttpClient;
use crate::classifier::RenderPlan;
use crate::config::Timeouts;
use crate::error::Error;
use crate::model::FetchOutcome;
use crate::renderer::{RenderContext, Renderer};
use anyhow::Result;
use std::time::Duration;
use tokio::time::Instant;

/// A browser context plus the HTTP client used for pre-checks.
pub struct RenderingSession {
    context: Option<Box<dyn RenderContext>>,
    http: HttpClient,
    timeouts: Timeouts,
    precheck: bool,
    snapshot_ready: bool,
    navigations: u64,
}

impl RenderingSession {
    /// Acquire a browser context. Failure is fatal for the batch.
    pub async fn open(
        renderer: &dyn Renderer,
        http: HttpClient,
        timeouts: Timeouts,
        precheck: bool,
    ) -> Result<Self, Error> {
        let context = renderer
            .new_context()
            .await
            .map_err(|e| Error::ResourceExhaustion(format!("{e:#}")))?;

        Ok(Self {
            context: Some(context),
            http,
            timeouts,
            precheck,
            snapshot_ready: false,
            navigations: 0,
        })
    }

    /// Number of navigations performed so far.
    pub fn navigations(&self) -> u64 {
        self.navigations
    }

    fn context(&self) -> Result<&dyn RenderContext> {
        self.context
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("rendering session already closed"))
    }

    /// Load `url`, wait for DOM-ready, apply the render plan, and capture the
    /// rendered markup.
    ///
    /// Timeouts and navigation failures are reported in the outcome. An `Err`
    /// means the browser context itself misbehaved (script evaluation failed,
    /// session closed); the caller turns that into an indeterminate verdict.
    pub async fn navigate(&mut self, url: &str, plan: &RenderPlan) -> Result<FetchOutcome> {
        self.snapshot_ready = false;
        let mut outcome = FetchOutcome::new(url);

        let mut precheck_error = None;
        if self.precheck {
            match self.http.status(url, self.timeouts.precheck_ms).await {
                Ok(404) => {
                    tracing::debug!("{url}: pre-check 404, skipping render");
                    outcome.status_code = Some(404);
                    outcome.precheck_status = Some(404);
                    return Ok(outcome);
                }
                Ok(status) => outcome.precheck_status = Some(status),
                Err(e) => precheck_error = Some(format!("{e:#}")),
            }
        }

        let timeout = Duration::from_millis(self.timeouts.navigation_ms);
        let deadline = Instant::now() + timeout;
        self.navigations += 1;

        let context = self
            .context
            .as_deref_mut()
            .ok_or_else(|| anyhow::anyhow!("rendering session already closed"))?;

        match context.navigate(url, self.timeouts.navigation_ms).await {
            Ok(nav) => {
                tracing::debug!("{url}: loaded in {}ms", nav.load_time_ms);
                outcome.final_url = nav.final_url;
            }
            Err(e) => {
                if let Some(Error::RenderTimeout { .. }) = e.downcast_ref::<Error>() {
                    tracing::debug!("{url}: {e}");
                    self.capture_partial(&mut outcome).await;
                } else {
                    outcome.transport_error = Some(match precheck_error {
                        Some(pre) => format!("{e:#} (pre-check: {pre})"),
                        None => format!("{e:#}"),
                    });
                }
                return Ok(outcome);
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if !self.context()?.wait_for_ready(remaining).await? {
            tracing::debug!("{url}: DOM not ready within {}ms", self.timeouts.navigation_ms);
            self.capture_partial(&mut outcome).await;
            return Ok(outcome);
        }

        if !plan.settle.is_zero() {
            tokio::time::sleep(plan.settle).await;
        }
        if let Some(selector) = &plan.await_selector {
            let found = self
                .context()?
                .wait_for_selector(selector, plan.marker_wait)
                .await?;
            tracing::debug!("{url}: marker {selector} present: {found}");
        }

        // Client-side redirects (login walls) land after DOM-ready.
        if let Ok(current) = self.context()?.get_url().await {
            if !current.is_empty() {
                outcome.final_url = current;
            }
        }

        self.snapshot_ready = true;
        outcome.rendered_markup = Some(self.render_snapshot().await?);
        Ok(outcome)
    }

    /// Fully rendered markup of the current page.
    ///
    /// Only valid directly after a successful [`navigate`](Self::navigate).
    pub async fn render_snapshot(&self) -> Result<String> {
        if !self.snapshot_ready {
            return Err(Error::NoActiveNavigation.into());
        }
        self.context()?.get_html().await
    }

    /// Record a timeout with whatever markup the page has so far.
    async fn capture_partial(&self, outcome: &mut FetchOutcome) {
        outcome.timed_out = true;
        let Ok(context) = self.context() else {
            return;
        };
        outcome.rendered_markup = context.get_html().await.ok();
        if let Ok(current) = context.get_url().await {
            if !current.is_empty() && current != "about:blank" {
                outcome.final_url = current;
            }
        }
    }

    /// Release the browser context.
    pub async fn close(mut self) -> Result<()> {
        self.snapshot_ready = false;
        match self.context.take() {
            Some(context) => context.close().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted renderer for exercising the session and validator without a
    //! browser.

    use super::*;
    use crate::renderer::NavigationResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// How a scripted page behaves.
    #[derive(Clone, Debug)]
    pub enum Script {
        /// Loads fine; `final_url` defaults to the requested URL.
        Page { html: String, final_url: Option<String> },
        /// Navigation times out with optional partial markup.
        Timeout { partial: Option<String> },
        /// Navigation fails with a transport error.
        Fail(String),
        /// Script evaluation fails after loading.
        Broken,
        /// Panics during navigation.
        Panic,
    }

    impl Script {
        pub fn page(html: &str) -> Self {
            Self::Page {
                html: html.to_string(),
                final_url: None,
            }
        }

        pub fn redirect(html: &str, final_url: &str) -> Self {
            Self::Page {
                html: html.to_string(),
                final_url: Some(final_url.to_string()),
            }
        }
    }

    #[derive(Default)]
    pub struct FakeState {
        pub scripts: HashMap<String, Script>,
        pub contexts_open: AtomicUsize,
        pub navigations: AtomicUsize,
        pub shutdowns: AtomicUsize,
        pub fail_new_context: bool,
        /// `querySelector` checks never succeed; the page lacks every marker.
        pub markers_absent: bool,
        /// Every script evaluated, in order.
        pub js_calls: Mutex<Vec<String>>,
    }

    /// Renderer whose pages are looked up by URL.
    #[derive(Clone, Default)]
    pub struct FakeRenderer {
        pub state: Arc<FakeState>,
    }

    impl FakeRenderer {
        pub fn new(scripts: Vec<(&str, Script)>) -> Self {
            Self {
                state: Arc::new(FakeState {
                    scripts: scripts
                        .into_iter()
                        .map(|(u, s)| (u.to_string(), s))
                        .collect(),
                    ..Default::default()
                }),
            }
        }

        pub fn without_markers(scripts: Vec<(&str, Script)>) -> Self {
            let mut renderer = Self::new(scripts);
            if let Some(state) = Arc::get_mut(&mut renderer.state) {
                state.markers_absent = true;
            }
            renderer
        }

        pub fn js_calls(&self) -> Vec<String> {
            self.state
                .js_calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }

        pub fn failing() -> Self {
            Self {
                state: Arc::new(FakeState {
                    fail_new_context: true,
                    ..Default::default()
                }),
            }
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
            if self.state.fail_new_context {
                anyhow::bail!("chrome exited with code 127");
            }
            self.state.contexts_open.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeContext {
                state: Arc::clone(&self.state),
                current: Mutex::new(None),
            }))
        }

        async fn shutdown(&self) -> Result<()> {
            self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn active_contexts(&self) -> usize {
            self.state.contexts_open.load(Ordering::SeqCst)
        }
    }

    pub struct FakeContext {
        state: Arc<FakeState>,
        current: Mutex<Option<(String, Script)>>,
    }

    impl FakeContext {
        fn current(&self) -> Option<(String, Script)> {
            self.current.lock().ok().and_then(|c| c.clone())
        }
    }

    #[async_trait]
    impl RenderContext for FakeContext {
        async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
            self.state.navigations.fetch_add(1, Ordering::SeqCst);
            let script = self
                .state
                .scripts
                .get(url)
                .cloned()
                .unwrap_or_else(|| Script::page("<html><body></body></html>"));
            if let Ok(mut current) = self.current.lock() {
                *current = Some((url.to_string(), script.clone()));
            }
            match script {
                Script::Page { final_url, .. } => Ok(NavigationResult {
                    final_url: final_url.unwrap_or_else(|| url.to_string()),
                    load_time_ms: 1,
                }),
                Script::Timeout { .. } => Err(Error::RenderTimeout {
                    url: url.to_string(),
                    timeout_ms,
                }
                .into()),
                Script::Fail(msg) => Err(Error::Transport(msg).into()),
                Script::Broken => Ok(NavigationResult {
                    final_url: url.to_string(),
                    load_time_ms: 1,
                }),
                Script::Panic => panic!("renderer crashed on {url}"),
            }
        }

        async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
            if let Ok(mut calls) = self.state.js_calls.lock() {
                calls.push(script.to_string());
            }
            match self.current() {
                Some((_, Script::Broken)) => anyhow::bail!("Execution context was destroyed"),
                _ if self.state.markers_absent && script.contains("querySelector") => {
                    Ok(serde_json::Value::Bool(false))
                }
                _ => Ok(serde_json::Value::Bool(true)),
            }
        }

        async fn get_html(&self) -> Result<String> {
            match self.current() {
                Some((_, Script::Page { html, .. })) => Ok(html),
                Some((_, Script::Timeout { partial: Some(html) })) => Ok(html),
                _ => anyhow::bail!("no document"),
            }
        }

        async fn get_url(&self) -> Result<String> {
            match self.current() {
                Some((url, Script::Page { final_url, .. })) => Ok(final_url.unwrap_or(url)),
                Some((url, _)) => Ok(url),
                None => Ok("about:blank".to_string()),
            }
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.state.contexts_open.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
