//! Core data types: platforms, social links, fetch outcomes, and verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// A social platform recognized by host keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    Instagram,
    LinkedIn,
    /// Twitter, including the `x.com` host.
    Twitter,
    YouTube,
    Flickr,
    Unknown,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Facebook => write!(f, "Facebook"),
            Self::Instagram => write!(f, "Instagram"),
            Self::LinkedIn => write!(f, "LinkedIn"),
            Self::Twitter => write!(f, "Twitter/X"),
            Self::YouTube => write!(f, "YouTube"),
            Self::Flickr => write!(f, "Flickr"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Maps a host keyword (e.g. `"linkedin"`, `"x.com"`) to its platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformKeyword {
    pub keyword: String,
    pub platform: Platform,
}

impl PlatformKeyword {
    pub fn new(keyword: &str, platform: Platform) -> Self {
        Self {
            keyword: keyword.to_ascii_lowercase(),
            platform,
        }
    }

    /// Dotted keywords match the host or any subdomain of it; bare keywords
    /// match a whole host label. `x.com` therefore never matches `box.com`.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if self.keyword.contains('.') {
            host == self.keyword || host.ends_with(&format!(".{}", self.keyword))
        } else {
            host.split('.').any(|label| label == self.keyword)
        }
    }
}

/// Detect the platform of an absolute URL, or `None` when no keyword matches.
pub fn detect_platform(url: &str, keywords: &[PlatformKeyword]) -> Option<Platform> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    keywords
        .iter()
        .find(|k| k.matches_host(host))
        .map(|k| k.platform)
}

/// Normalize a link URL into its identity key.
///
/// Scheme and host are lowercased, a leading `www.` is dropped, the fragment
/// is removed, a trailing slash is trimmed from non-root paths, and only the
/// query parameters listed in `keep_params` survive (in their original order).
pub fn normalize_url(raw: &str, keep_params: &[String]) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut out = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        out.push_str(&format!(":{port}"));
    }

    let path = parsed.path();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        "/"
    };
    out.push_str(if path.is_empty() { "/" } else { path });

    let kept: Vec<String> = parsed
        .query_pairs()
        .filter(|(k, _)| keep_params.iter().any(|p| p == k.as_ref()))
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }

    Some(out)
}

/// A discovered link to a social platform page.
///
/// Immutable once handed to validation; only [`LinkSet`] records additional
/// sources while links are still being collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    source_domains: Vec<String>,
    url: String,
    platform: Platform,
}

impl SocialLink {
    pub fn new(source_domain: impl Into<String>, url: impl Into<String>, platform: Platform) -> Self {
        Self {
            source_domains: vec![source_domain.into()],
            url: url.into(),
            platform,
        }
    }

    /// The first domain this link was observed on.
    pub fn source_domain(&self) -> &str {
        self.source_domains
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Every domain this link was observed on, in observation order.
    pub fn source_domains(&self) -> &[String] {
        &self.source_domains
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Path component of the link URL, or `"/"` if it does not parse.
    pub fn path(&self) -> String {
        Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    fn add_source(&mut self, source: &str) {
        if !self.source_domains.iter().any(|s| s == source) {
            self.source_domains.push(source.to_string());
        }
    }
}

/// How duplicate links observed on several domains are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Keep only the first observed source domain.
    #[default]
    FirstSource,
    /// Record every distinct source domain.
    AllSources,
}

/// Ordered, deduplicating collection of social links keyed by normalized URL.
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    links: Vec<SocialLink>,
    index: HashMap<String, usize>,
    mode: DedupMode,
    keep_params: Vec<String>,
}

impl LinkSet {
    pub fn new(mode: DedupMode, keep_params: Vec<String>) -> Self {
        Self {
            links: Vec::new(),
            index: HashMap::new(),
            mode,
            keep_params,
        }
    }

    /// Insert a link. Returns `true` when the link was new.
    ///
    /// URLs that fail to normalize are keyed by their raw text so they still
    /// get a verdict.
    pub fn insert(&mut self, source: &str, url: &str, platform: Platform) -> bool {
        let key = normalize_url(url, &self.keep_params).unwrap_or_else(|| url.trim().to_string());
        if let Some(&i) = self.index.get(&key) {
            if self.mode == DedupMode::AllSources {
                self.links[i].add_source(source);
            }
            return false;
        }
        self.index.insert(key, self.links.len());
        self.links.push(SocialLink::new(source, url.trim(), platform));
        true
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocialLink> {
        self.links.iter()
    }

    pub fn into_links(self) -> Vec<SocialLink> {
        self.links
    }
}

/// Result of one navigation. Built fresh per link and never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub requested_url: String,
    /// Status that describes the page itself. Only a pre-check 404 is trusted
    /// here; the browser does not report one.
    pub status_code: Option<u16>,
    /// Raw status of the plain-HTTP pre-check. Platforms answer non-browser
    /// clients with 429/999, so this only counts when nothing rendered.
    pub precheck_status: Option<u16>,
    /// URL after redirects.
    pub final_url: String,
    pub rendered_markup: Option<String>,
    pub timed_out: bool,
    pub transport_error: Option<String>,
}

impl FetchOutcome {
    pub fn new(requested_url: &str) -> Self {
        Self {
            requested_url: requested_url.to_string(),
            final_url: requested_url.to_string(),
            ..Default::default()
        }
    }

    /// Non-empty rendered markup, if any.
    pub fn markup(&self) -> Option<&str> {
        self.rendered_markup
            .as_deref()
            .filter(|m| !m.trim().is_empty())
    }
}

/// Accessibility state of a social link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictState {
    Live,
    NotFound,
    Removed,
    PrivateOrRestricted,
    RequiresLogin,
    RateLimitedOrBlocked,
    Indeterminate,
}

impl VerdictState {
    /// Category label used as the prefix of the report `Status` column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "OK",
            Self::NotFound => "NOT FOUND",
            Self::Removed => "REMOVED",
            Self::PrivateOrRestricted => "PRIVATE",
            Self::RequiresLogin => "LOGIN REQUIRED",
            Self::RateLimitedOrBlocked => "BLOCKED",
            Self::Indeterminate => "INDETERMINATE",
        }
    }

    /// States that indicate the page is gone or unusable.
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::NotFound | Self::Removed)
    }
}

impl std::fmt::Display for VerdictState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Final classification of one link in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub link: SocialLink,
    pub state: VerdictState,
    /// Human-readable reason: matched phrase, status code, or error text.
    pub evidence: String,
    /// Version of the rule table that produced this verdict.
    pub rules_version: u32,
    pub checked_at: DateTime<Utc>,
}

impl Verdict {
    pub fn new(link: SocialLink, state: VerdictState, evidence: impl Into<String>, rules_version: u32) -> Self {
        Self {
            link,
            state,
            evidence: evidence.into(),
            rules_version,
            checked_at: Utc::now(),
        }
    }

    /// `"<CATEGORY>: <evidence>"`, the report `Status` column.
    pub fn status_line(&self) -> String {
        format!("{}: {}", self.state.label(), self.evidence)
    }
}
