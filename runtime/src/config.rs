//! Configuration loading and resolution.
//!
//! Everything the classifier and collaborators used to read from module-level
//! constants lives here: the versioned rule table, the platform keyword set,
//! timeouts, and pool sizes. A JSON file may override any subset of fields.

use crate::error::Error;
use crate::model::{DedupMode, Platform, PlatformKeyword};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "SOCIALCHECK_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "socialcheck.json";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                  AppleWebKit/537.36 (KHTML, like Gecko) \
                                  Chrome/131.0.0.0 Safari/537.36";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rules: RuleTable,
    pub keywords: Vec<PlatformKeyword>,
    pub timeouts: Timeouts,
    /// Worker pool size for liveness checks and extraction.
    pub concurrency: usize,
    /// Independent rendering sessions used for validation.
    pub sessions: usize,
    /// Run a HEAD/GET pre-check before rendering each link.
    pub precheck: bool,
    /// Skip TLS verification when fetching organization pages.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    pub dedup: DedupMode,
    /// Query parameters that identify a page and survive URL normalization.
    pub required_query_params: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: RuleTable::default(),
            keywords: default_keywords(),
            timeouts: Timeouts::default(),
            concurrency: 5,
            sessions: 1,
            precheck: true,
            accept_invalid_certs: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            dedup: DedupMode::FirstSource,
            required_query_params: vec!["v".into(), "id".into(), "list".into()],
        }
    }
}

impl Config {
    /// Load configuration, resolving the file location in order:
    /// explicit path, `SOCIALCHECK_CONFIG`, `./socialcheck.json`, defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a (possibly partial) JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        tracing::debug!(
            "loaded config from {} (rules v{})",
            path.display(),
            config.rules.version
        );
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".into()));
        }
        if self.sessions == 0 {
            return Err(Error::Config("sessions must be at least 1".into()));
        }
        if self.keywords.is_empty() {
            return Err(Error::Config("platform keyword set is empty".into()));
        }
        for selector in [
            &self.rules.twitter.primary_column_selector,
            &self.rules.instagram.profile_header_selector,
        ] {
            scraper::Selector::parse(selector)
                .map_err(|e| Error::Config(format!("bad selector {selector:?}: {e}")))?;
        }
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let cwd = PathBuf::from(DEFAULT_CONFIG_FILE);
    if cwd.exists() {
        return Some(cwd);
    }

    None
}

/// The keyword allowlist: youtube, facebook, linkedin, instagram, flickr,
/// twitter, x.com.
pub fn default_keywords() -> Vec<PlatformKeyword> {
    vec![
        PlatformKeyword::new("youtube", Platform::YouTube),
        PlatformKeyword::new("facebook", Platform::Facebook),
        PlatformKeyword::new("linkedin", Platform::LinkedIn),
        PlatformKeyword::new("instagram", Platform::Instagram),
        PlatformKeyword::new("flickr", Platform::Flickr),
        PlatformKeyword::new("twitter", Platform::Twitter),
        PlatformKeyword::new("x.com", Platform::Twitter),
    ]
}

/// Timeouts and fixed waits, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub liveness_ms: u64,
    pub extraction_ms: u64,
    pub precheck_ms: u64,
    /// Bound on page load plus DOM-ready wait.
    pub navigation_ms: u64,
    /// Unconditional wait before reading markup on client-rendered platforms.
    pub settle_ms: u64,
    /// Bound on waiting for a platform marker after the settle delay.
    pub marker_wait_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            liveness_ms: 15_000,
            extraction_ms: 20_000,
            precheck_ms: 10_000,
            navigation_ms: 15_000,
            settle_ms: 5_000,
            marker_wait_ms: 3_000,
        }
    }
}

impl Timeouts {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn marker_wait(&self) -> Duration {
        Duration::from_millis(self.marker_wait_ms)
    }

    /// Zero waits and short bounds, for tests against local servers.
    pub fn fast() -> Self {
        Self {
            liveness_ms: 500,
            extraction_ms: 500,
            precheck_ms: 500,
            navigation_ms: 500,
            settle_ms: 0,
            marker_wait_ms: 0,
        }
    }
}

/// Versioned rule table consumed by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTable {
    /// Bumped whenever a phrase, marker, or rule order changes.
    pub version: u32,
    /// Generic removal/suspension phrases scanned after platform rules.
    pub removal_phrases: Vec<String>,
    /// Status codes that mean the request was throttled or walled off.
    pub blocked_statuses: Vec<u16>,
    pub twitter: TwitterRules,
    pub linkedin: LinkedInRules,
    pub instagram: InstagramRules,
    pub facebook: FacebookRules,
    pub youtube: YouTubeRules,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            version: 3,
            removal_phrases: strings(&[
                "This content isn't available right now",
                "This account doesn't exist",
                "This LinkedIn Page isn't available",
                "The Page you're searching for no longer exists.",
                "The link you followed may be broken, or the page may have been removed.",
                "Sorry, this page isn't available",
                "Page not found",
                "Account suspended",
            ]),
            blocked_statuses: vec![429, 999],
            twitter: TwitterRules::default(),
            linkedin: LinkedInRules::default(),
            instagram: InstagramRules::default(),
            facebook: FacebookRules::default(),
            youtube: YouTubeRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterRules {
    /// Marker rendered only once a profile timeline has loaded.
    pub primary_column_selector: String,
    pub protected_phrases: Vec<String>,
}

impl Default for TwitterRules {
    fn default() -> Self {
        Self {
            primary_column_selector: r#"[data-testid="primaryColumn"]"#.to_string(),
            protected_phrases: strings(&["These posts are protected", "These Tweets are protected"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedInRules {
    pub not_found_segments: Vec<String>,
    pub login_segments: Vec<String>,
    /// Path prefixes of individual profiles.
    pub profile_prefixes: Vec<String>,
}

impl Default for LinkedInRules {
    fn default() -> Self {
        Self {
            not_found_segments: strings(&["/company/unavailable", "/pagenotfound", "/404"]),
            login_segments: strings(&["/authwall", "/login", "/uas/login", "/checkpoint"]),
            profile_prefixes: strings(&["/in/"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstagramRules {
    pub not_found_phrases: Vec<String>,
    pub private_phrases: Vec<String>,
    pub profile_header_selector: String,
    pub login_segments: Vec<String>,
}

impl Default for InstagramRules {
    fn default() -> Self {
        Self {
            not_found_phrases: strings(&[
                "Sorry, this page isn't available",
                "Page not found",
                "The link you followed may be broken, or the page may have been removed",
                "Go back to Instagram",
            ]),
            private_phrases: strings(&["This account is private"]),
            profile_header_selector: "header section".to_string(),
            login_segments: strings(&["/accounts/login"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacebookRules {
    pub unavailable_phrases: Vec<String>,
    pub login_segments: Vec<String>,
}

impl Default for FacebookRules {
    fn default() -> Self {
        Self {
            unavailable_phrases: strings(&[
                "This content isn't available right now",
                "This page isn't available",
                "The link you followed may be broken",
            ]),
            login_segments: strings(&["/login"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeRules {
    /// Only links under these paths get the YouTube rule.
    pub channel_prefixes: Vec<String>,
    pub not_found_phrases: Vec<String>,
}

impl Default for YouTubeRules {
    fn default() -> Self {
        Self {
            channel_prefixes: strings(&["/channel/", "/user/", "/c/"]),
            not_found_phrases: strings(&["page isn't available", "404"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.timeouts.settle_ms, 5_000);
        assert_eq!(config.keywords.len(), 7);
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"concurrency": 2, "timeouts": {{"settle_ms": 100}}, "rules": {{"version": 9}}}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.timeouts.settle_ms, 100);
        assert_eq!(config.timeouts.navigation_ms, 15_000);
        assert_eq!(config.rules.version, 9);
        assert!(!config.rules.removal_phrases.is_empty());
    }

    #[test]
    fn test_bad_selector_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"rules": {{"twitter": {{"primary_column_selector": "[[["}}}}}}"#
        )
        .unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let resolved = resolve_config_path(Some(file.path())).unwrap();
        assert_eq!(resolved, file.path());
    }
}
