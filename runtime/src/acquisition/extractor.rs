//! Anchor scan for outbound social-platform links.
//!
//! The HTML walk is synchronous because `scraper::Html` is `!Send`; it runs
//! after the body has been fetched and never across an await point.

use super::http_client::HttpClient;
use crate::error::Error;
use crate::model::{detect_platform, Platform, PlatformKeyword};
use anyhow::{Context, Result};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// A social link found on (or equal to) an organization page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedLink {
    pub platform: Platform,
    pub url: String,
}

/// Scan `html` for anchors whose host matches a platform keyword, plus the
/// page URL itself when it is already a social URL.
///
/// Relative hrefs are resolved against `page_url`; non-http(s) targets are
/// ignored. Results keep document order without duplicates.
pub fn extract_from_html(
    page_url: &str,
    html: &str,
    keywords: &[PlatformKeyword],
) -> Vec<ExtractedLink> {
    let base = Url::parse(page_url).ok();
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |url: String| {
        if let Some(platform) = detect_platform(&url, keywords) {
            if seen.insert(url.clone()) {
                links.push(ExtractedLink { platform, url });
            }
        }
    };

    if let Ok(anchor) = Selector::parse("a[href]") {
        for element in document.select(&anchor) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let resolved = match &base {
                Some(base) => base.join(href.trim()),
                None => Url::parse(href.trim()),
            };
            let Ok(resolved) = resolved else {
                continue;
            };
            if matches!(resolved.scheme(), "http" | "https") {
                push(resolved.to_string());
            }
        }
    }

    push(page_url.to_string());
    links
}

/// Fetch `url` and scan it for social links.
///
/// Only a 200 response is scanned; anything else is an error for this page.
pub async fn extract_social_links(
    client: &HttpClient,
    url: &str,
    keywords: &[PlatformKeyword],
    timeout_ms: u64,
) -> Result<Vec<ExtractedLink>> {
    let resp = client
        .get(url, timeout_ms)
        .await
        .with_context(|| format!("failed to fetch {url}"))?;

    if resp.status != 200 {
        return Err(Error::Transport(format!("{} status for {url}", resp.status)).into());
    }

    let links = extract_from_html(&resp.final_url, &resp.body, keywords);
    tracing::debug!("{url}: {} social link(s)", links.len());
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_keywords;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><body>
          <a href="https://www.facebook.com/acme">Facebook</a>
          <a href="https://twitter.com/acme">Twitter</a>
          <a href="https://x.com/acme">X</a>
          <a href="https://www.dropbox.com/acme">Box</a>
          <a href="https://www.youtube.com/c/Acme">YouTube</a>
          <a href="/about">About</a>
          <a href="mailto:info@facebook.com">Mail</a>
          <a href="https://www.facebook.com/acme">Facebook again</a>
          <a>no href</a>
        </body></html>
    "#;

    #[test]
    fn test_extract_social_anchors() {
        let links = extract_from_html("https://acme.org/", PAGE, &default_keywords());
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.facebook.com/acme",
                "https://twitter.com/acme",
                "https://x.com/acme",
                "https://www.youtube.com/c/Acme",
            ]
        );
        assert_eq!(links[1].platform, Platform::Twitter);
        assert_eq!(links[2].platform, Platform::Twitter);
    }

    #[test]
    fn test_self_url_included_when_social() {
        let links = extract_from_html(
            "https://www.linkedin.com/company/acme",
            "<html><body>nothing</body></html>",
            &default_keywords(),
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].platform, Platform::LinkedIn);
    }

    #[test]
    fn test_relative_links_resolve_against_social_page() {
        let links = extract_from_html(
            "https://www.flickr.com/photos/acme",
            r#"<a href="/photos/acme/albums">albums</a>"#,
            &default_keywords(),
        );
        assert!(links
            .iter()
            .any(|l| l.url == "https://www.flickr.com/photos/acme/albums"));
    }

    #[tokio::test]
    async fn test_extract_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let client = HttpClient::new("test", 2000, false);
        let links = extract_social_links(&client, &server.uri(), &default_keywords(), 2000)
            .await
            .unwrap();
        assert_eq!(links.len(), 4);
    }

    #[tokio::test]
    async fn test_non_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpClient::new("test", 2000, false);
        let err = extract_social_links(&client, &server.uri(), &default_keywords(), 2000)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
