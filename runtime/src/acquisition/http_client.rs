//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests. Used for liveness checks, the anchor
//! scan, and the cheap status pre-check that runs before rendering.

use anyhow::Result;
use std::time::Duration;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// HTTP client shared by the collaborators.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for sites that reject HTTP/2.
    h1_client: reqwest::Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// `accept_invalid_certs` skips TLS verification; organization sites with
    /// expired certificates still carry useful social links.
    pub fn new(user_agent: &str, timeout_ms: u64, accept_invalid_certs: bool) -> Self {
        let builder = || {
            reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .redirect(reqwest::redirect::Policy::limited(10))
                .user_agent(user_agent)
                .danger_accept_invalid_certs(accept_invalid_certs)
        };

        let client = builder().build().unwrap_or_default();
        let h1_client = builder().http1_only().build().unwrap_or_default();

        Self { client, h1_client }
    }

    /// GET a URL, reading the body.
    ///
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject HTTP/2).
    pub async fn get(&self, url: &str, timeout_ms: u64) -> Result<HttpResponse> {
        match Self::get_inner(&self.client, url, timeout_ms).await {
            Ok(resp) => Ok(resp),
            Err(e) if looks_like_protocol_error(&e) => {
                tracing::debug!("retrying {url} over HTTP/1.1: {e}");
                Self::get_inner(&self.h1_client, url, timeout_ms).await
            }
            Err(e) => Err(e),
        }
    }

    async fn get_inner(
        client: &reqwest::Client,
        url: &str,
        timeout_ms: u64,
    ) -> Result<HttpResponse> {
        let r = client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await?;

        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let body = r.text().await.unwrap_or_default();

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }

    /// Status code of a URL without reading the body.
    ///
    /// Sends HEAD first; servers that reject HEAD (405/501) get a GET.
    pub async fn status(&self, url: &str, timeout_ms: u64) -> Result<u16> {
        let timeout = Duration::from_millis(timeout_ms);
        let head = self.client.head(url).timeout(timeout).send().await?;
        let status = head.status().as_u16();
        if status != 405 && status != 501 {
            return Ok(status);
        }

        let get = self.client.get(url).timeout(timeout).send().await?;
        Ok(get.status().as_u16())
    }
}

fn looks_like_protocol_error(e: &anyhow::Error) -> bool {
    let s = format!("{e:#}");
    s.contains("http2") || s.contains("protocol") || s.contains("connection closed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", format!("{}/new", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let client = HttpClient::new("test", 2000, false);
        let resp = client.get(&format!("{}/old", server.uri()), 2000).await.unwrap();
        assert_eq!(resp.status, 200);
        assert!(resp.final_url.ends_with("/new"));
        assert_eq!(resp.body, "hello");
    }

    #[tokio::test]
    async fn test_status_falls_back_to_get_when_head_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new("test", 2000, false);
        let status = client.status(&format!("{}/gone", server.uri()), 2000).await.unwrap();
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_status_uses_head_result() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new("test", 2000, false);
        let status = client.status(&server.uri(), 2000).await.unwrap();
        assert_eq!(status, 200);
    }
}
