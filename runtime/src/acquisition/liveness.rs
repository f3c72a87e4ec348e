//! Domain liveness: does a bare domain resolve to a usable web page?

use super::http_client::HttpClient;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

/// Outcome of one liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessResult {
    /// The domain as given.
    pub input: String,
    /// The URL that was requested (input with a scheme).
    pub url: String,
    /// 2xx or 3xx final status.
    pub reachable: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// Prefix `https://` when the input has no scheme.
pub fn with_scheme(domain: &str) -> String {
    let domain = domain.trim();
    if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

/// Check a single domain. Failures are reported, never raised.
pub async fn fetch_liveness(client: &HttpClient, domain: &str, timeout_ms: u64) -> LivenessResult {
    let url = with_scheme(domain);
    match client.get(&url, timeout_ms).await {
        Ok(resp) => LivenessResult {
            input: domain.trim().to_string(),
            url,
            reachable: (200..400).contains(&resp.status),
            status: Some(resp.status),
            error: None,
        },
        Err(e) => {
            tracing::debug!("{url} unreachable: {e:#}");
            LivenessResult {
                input: domain.trim().to_string(),
                url,
                reachable: false,
                status: None,
                error: Some(format!("{e:#}")),
            }
        }
    }
}

/// Check every domain on a bounded pool.
///
/// `on_result` sees each result as it completes; the returned list is in
/// input order.
pub async fn check_domains(
    client: &HttpClient,
    domains: &[String],
    concurrency: usize,
    timeout_ms: u64,
    mut on_result: impl FnMut(&LivenessResult),
) -> Vec<LivenessResult> {
    let mut checks = stream::iter(domains.iter().enumerate())
        .map(|(i, domain)| async move { (i, fetch_liveness(client, domain, timeout_ms).await) })
        .buffer_unordered(concurrency.max(1));

    let mut slots: Vec<Option<LivenessResult>> = vec![None; domains.len()];
    while let Some((i, result)) = checks.next().await {
        on_result(&result);
        slots[i] = Some(result);
    }
    slots.into_iter().flatten().collect()
}
