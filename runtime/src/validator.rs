//! Batch validation: render every link and classify the result.
//!
//! Links are split into contiguous partitions, one per rendering session.
//! Each session walks its partition sequentially. Verdicts are re-sequenced
//! so that `Verdict` events and the returned list follow submission order
//! regardless of which session finished first.
//!
//! Every link yields exactly one verdict. Errors and panics inside a single
//! link's navigation become an `Indeterminate` verdict for that link; only a
//! failure to acquire the browser aborts the batch.

use crate::acquisition::http_client::HttpClient;
use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::Error;
use crate::events::{EventEmitter, EventKind, Stage};
use crate::model::{SocialLink, Verdict};
use crate::renderer::Renderer;
use crate::session::RenderingSession;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Cooperative cancellation shared between the caller and a running batch.
///
/// Checked before each link; a link already rendering finishes normally.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Renders and classifies batches of social links.
pub struct Validator {
    classifier: Arc<Classifier>,
    config: Config,
    http: HttpClient,
}

impl Validator {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let classifier = Classifier::new(config)?;
        let http = HttpClient::new(
            &config.user_agent,
            config.timeouts.precheck_ms,
            config.accept_invalid_certs,
        );
        Ok(Self {
            classifier: Arc::new(classifier),
            config: config.clone(),
            http,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Validate `links`, returning one verdict per link in submission order.
    ///
    /// The renderer is shut down before this returns, on every path.
    pub async fn validate_batch(
        &self,
        renderer: Arc<dyn Renderer>,
        links: Vec<SocialLink>,
        events: &EventEmitter,
        cancel: &CancelFlag,
    ) -> Result<Vec<Verdict>, Error> {
        let result = self.run(renderer.as_ref(), links, events, cancel).await;
        if let Err(e) = renderer.shutdown().await {
            tracing::warn!("browser shutdown failed: {e:#}");
        }
        result
    }

    async fn run(
        &self,
        renderer: &dyn Renderer,
        links: Vec<SocialLink>,
        events: &EventEmitter,
        cancel: &CancelFlag,
    ) -> Result<Vec<Verdict>, Error> {
        let total = links.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let chunk = total.div_ceil(self.config.sessions.clamp(1, total));
        let partitions = total.div_ceil(chunk);
        let sessions = self.open_sessions(renderer, partitions).await?;
        tracing::info!("validating {total} link(s) across {partitions} session(s)");

        let started = Instant::now();
        events.emit(EventKind::StageStarted {
            stage: Stage::Validation,
            total,
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let workers = sessions
            .into_iter()
            .zip(links.chunks(chunk).enumerate())
            .map(|(session, (n, part))| {
                let tx = tx.clone();
                self.run_partition(session, n * chunk, part, tx, cancel)
            })
            .collect::<Vec<_>>();
        drop(tx);

        let (closed, verdicts) =
            futures::join!(join_all(workers), reorder(rx, total, events));

        for session in closed {
            if let Err(e) = session.close().await {
                tracing::warn!("failed to close rendering session: {e:#}");
            }
        }

        events.emit(EventKind::StageCompleted {
            stage: Stage::Validation,
            processed: verdicts.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        Ok(verdicts)
    }

    /// Open all sessions up front. On failure, release what was opened.
    async fn open_sessions(
        &self,
        renderer: &dyn Renderer,
        count: usize,
    ) -> Result<Vec<RenderingSession>, Error> {
        let mut sessions = Vec::with_capacity(count);
        for _ in 0..count {
            match RenderingSession::open(
                renderer,
                self.http.clone(),
                self.config.timeouts.clone(),
                self.config.precheck,
            )
            .await
            {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::error!("failed to open rendering session: {e}");
                    for session in sessions {
                        let _ = session.close().await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(sessions)
    }

    async fn run_partition(
        &self,
        mut session: RenderingSession,
        offset: usize,
        links: &[SocialLink],
        tx: mpsc::UnboundedSender<(usize, Verdict)>,
        cancel: &CancelFlag,
    ) -> RenderingSession {
        for (i, link) in links.iter().enumerate() {
            let verdict = if cancel.is_cancelled() {
                self.classifier.indeterminate(link, "batch cancelled")
            } else {
                self.validate_one(&mut session, link).await
            };
            let _ = tx.send((offset + i, verdict));
        }
        session
    }

    /// Navigate and classify one link. Never fails.
    async fn validate_one(&self, session: &mut RenderingSession, link: &SocialLink) -> Verdict {
        let plan = self.classifier.render_plan(link);
        let attempt = AssertUnwindSafe(session.navigate(link.url(), &plan))
            .catch_unwind()
            .await;

        match attempt {
            Ok(Ok(outcome)) => self.classifier.classify(link, &outcome),
            Ok(Err(e)) => {
                tracing::warn!("{}: render failed: {e:#}", link.url());
                self.classifier
                    .indeterminate(link, format!("render failed: {e:#}"))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("{}: render panicked: {message}", link.url());
                self.classifier
                    .indeterminate(link, format!("render panicked: {message}"))
            }
        }
    }
}

/// Release verdicts in submission order as their predecessors arrive.
async fn reorder(
    mut rx: mpsc::UnboundedReceiver<(usize, Verdict)>,
    total: usize,
    events: &EventEmitter,
) -> Vec<Verdict> {
    let mut pending = BTreeMap::new();
    let mut ordered = Vec::with_capacity(total);
    let mut done = 0;

    while let Some((index, verdict)) = rx.recv().await {
        done += 1;
        events.progress(
            Stage::Validation,
            done,
            total,
            format!("{} {}", verdict.link.url(), verdict.state),
        );
        pending.insert(index, verdict);

        while let Some(verdict) = pending.remove(&ordered.len()) {
            events.emit(EventKind::Verdict {
                verdict: verdict.clone(),
            });
            ordered.push(verdict);
        }
    }

    // A partition that vanished without reporting would leave gaps; flush
    // whatever is left so nothing is silently dropped.
    for (_, verdict) in pending {
        events.emit(EventKind::Verdict {
            verdict: verdict.clone(),
        });
        ordered.push(verdict);
    }
    ordered
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
