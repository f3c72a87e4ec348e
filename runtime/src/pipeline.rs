//! Liveness → extraction → validation.
//!
//! Each stage can run on its own (the `check`, `scrape` and `validate`
//! subcommands) or chained by [`Pipeline::run`]. The browser is launched
//! lazily: a run that finds no social links never starts Chromium.

use crate::acquisition::extractor::extract_social_links;
use crate::acquisition::http_client::HttpClient;
use crate::acquisition::liveness::{check_domains, LivenessResult};
use crate::config::Config;
use crate::error::Error;
use crate::events::{EventEmitter, EventKind, Stage};
use crate::model::{LinkSet, SocialLink, Verdict};
use crate::renderer::Renderer;
use crate::validator::{CancelFlag, Validator};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Everything a full run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub liveness: Vec<LivenessResult>,
    pub links: Vec<SocialLink>,
    pub verdicts: Vec<Verdict>,
}

impl PipelineReport {
    pub fn reachable(&self) -> usize {
        self.liveness.iter().filter(|r| r.reachable).count()
    }
}

/// The three stages sharing one configuration.
pub struct Pipeline {
    config: Config,
    http: HttpClient,
    validator: Validator,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self, Error> {
        let validator = Validator::new(&config)?;
        let http = HttpClient::new(
            &config.user_agent,
            config.timeouts.extraction_ms.max(config.timeouts.liveness_ms),
            config.accept_invalid_certs,
        );
        Ok(Self {
            config,
            http,
            validator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Liveness-check `domains`, returning results in input order.
    pub async fn check(&self, domains: &[String], events: &EventEmitter) -> Vec<LivenessResult> {
        let total = domains.len();
        let started = Instant::now();
        tracing::info!("checking {total} domain(s)");
        events.emit(EventKind::StageStarted {
            stage: Stage::Liveness,
            total,
        });

        let mut done = 0;
        let results = check_domains(
            &self.http,
            domains,
            self.config.concurrency,
            self.config.timeouts.liveness_ms,
            |result| {
                done += 1;
                let message = if result.reachable {
                    format!("{} reachable", result.url)
                } else {
                    format!("{} unreachable", result.url)
                };
                events.progress(Stage::Liveness, done, total, message);
            },
        )
        .await;

        let reachable = results.iter().filter(|r| r.reachable).count();
        tracing::info!("{reachable}/{total} domain(s) reachable");
        events.emit(EventKind::StageCompleted {
            stage: Stage::Liveness,
            processed: results.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        results
    }

    /// Scrape each page for social links.
    ///
    /// Pages are fetched concurrently but merged in input order, so the
    /// first source recorded for a shared link is deterministic.
    pub async fn scrape(&self, urls: &[String], events: &EventEmitter) -> LinkSet {
        let total = urls.len();
        let started = Instant::now();
        tracing::info!("scraping {total} page(s)");
        events.emit(EventKind::StageStarted {
            stage: Stage::Extraction,
            total,
        });

        let keywords = &self.config.keywords;
        let timeout_ms = self.config.timeouts.extraction_ms;
        let mut pages = stream::iter(urls.iter().enumerate())
            .map(|(i, url)| async move {
                let found = extract_social_links(&self.http, url, keywords, timeout_ms).await;
                (i, url, found)
            })
            .buffer_unordered(self.config.concurrency.max(1));

        let mut done = Vec::with_capacity(total);
        while let Some((i, url, found)) = pages.next().await {
            let message = match &found {
                Ok(links) => format!("{url}: {} social link(s)", links.len()),
                Err(e) => {
                    tracing::warn!("{url}: extraction failed: {e:#}");
                    events.warning(format!("{url}: extraction failed: {e:#}"));
                    format!("{url}: failed")
                }
            };
            events.progress(Stage::Extraction, done.len() + 1, total, message);
            done.push((i, url, found));
        }
        done.sort_by_key(|(i, _, _)| *i);

        let mut set = LinkSet::new(self.config.dedup, self.config.required_query_params.clone());
        for (_, url, found) in done {
            let Ok(links) = found else {
                continue;
            };
            let source = source_domain(url);
            for link in links {
                if set.insert(&source, &link.url, link.platform) {
                    events.emit(EventKind::LinkFound {
                        source: source.clone(),
                        url: link.url,
                        platform: link.platform,
                    });
                }
            }
        }

        tracing::info!("{} unique social link(s)", set.len());
        events.emit(EventKind::StageCompleted {
            stage: Stage::Extraction,
            processed: total,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        set
    }

    /// Render and classify `links` on an already launched browser.
    pub async fn validate(
        &self,
        renderer: Arc<dyn Renderer>,
        links: Vec<SocialLink>,
        events: &EventEmitter,
        cancel: &CancelFlag,
    ) -> Result<Vec<Verdict>, Error> {
        self.validator
            .validate_batch(renderer, links, events, cancel)
            .await
    }

    /// Run all three stages. `launch` starts the browser and is only called
    /// when extraction found at least one link.
    pub async fn run<F, Fut>(
        &self,
        domains: &[String],
        launch: F,
        events: &EventEmitter,
        cancel: &CancelFlag,
    ) -> Result<PipelineReport, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Renderer>, Error>>,
    {
        let liveness = self.check(domains, events).await;
        let reachable: Vec<String> = liveness
            .iter()
            .filter(|r| r.reachable)
            .map(|r| r.url.clone())
            .collect();

        let links = if reachable.is_empty() || cancel.is_cancelled() {
            Vec::new()
        } else {
            self.scrape(&reachable, events).await.into_links()
        };

        let verdicts = if links.is_empty() {
            tracing::info!("no social links to validate");
            Vec::new()
        } else {
            let renderer = launch().await?;
            self.validate(renderer, links.clone(), events, cancel)
                .await?
        };

        Ok(PipelineReport {
            liveness,
            links,
            verdicts,
        })
    }
}

/// Host of a page URL without `www.`, used as the source column.
pub fn source_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::model::Platform;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline() -> Pipeline {
        Pipeline::new(Config {
            timeouts: Timeouts::fast(),
            precheck: false,
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_source_domain() {
        assert_eq!(source_domain("https://www.acme.org/about"), "acme.org");
        assert_eq!(source_domain("http://127.0.0.1:8080/a"), "127.0.0.1");
        assert_eq!(source_domain("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_check_keeps_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/up"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let domains = vec![
            format!("{}/down", server.uri()),
            format!("{}/up", server.uri()),
        ];
        let results = pipeline().check(&domains, &EventEmitter::disabled()).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].reachable);
        assert!(results[1].reachable);
    }

    #[tokio::test]
    async fn test_scrape_first_source_is_input_order() {
        let server = MockServer::start().await;
        let page = r#"<a href="https://www.facebook.com/acme/">fb</a>"#;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page)
                    .set_delay(std::time::Duration::from_millis(150)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a href="https://facebook.com/acme">fb</a>
                   <a href="https://www.youtube.com/watch?v=abc&utm_source=x">yt</a>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let urls = vec![
            format!("{}/slow", server.uri()),
            format!("{}/broken", server.uri()),
            format!("{}/fast", server.uri()),
        ];
        let (emitter, mut rx) = crate::events::channel();
        let set = pipeline().scrape(&urls, &emitter).await;
        drop(emitter);

        let links = set.into_links();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].platform(), Platform::Facebook);
        assert_eq!(links[0].url(), "https://www.facebook.com/acme/");
        assert_eq!(links[1].platform(), Platform::YouTube);

        let mut warnings = 0;
        let mut found = 0;
        while let Some(event) = rx.recv().await {
            match event.kind {
                EventKind::Warning { .. } => warnings += 1,
                EventKind::LinkFound { .. } => found += 1,
                _ => {}
            }
        }
        assert_eq!(warnings, 1);
        assert_eq!(found, 2);
    }

    #[tokio::test]
    async fn test_run_without_links_never_launches_browser() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>no socials</p>"))
            .mount(&server)
            .await;

        let report = pipeline()
            .run(
                &[server.uri()],
                || async { Err::<Arc<dyn Renderer>, _>(Error::ResourceExhaustion("unused".into())) },
                &EventEmitter::disabled(),
                &CancelFlag::new(),
            )
            .await
            .unwrap();
        assert_eq!(report.reachable(), 1);
        assert!(report.links.is_empty());
        assert!(report.verdicts.is_empty());
    }
}
