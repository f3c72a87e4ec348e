//! Platform classifier: maps a `(SocialLink, FetchOutcome)` pair to a verdict.
//!
//! Classification walks ordered rule chains and stops at the first hit:
//!
//! 1. the general chain (404, transport error, render timeout, blocked status),
//! 2. the chain for the link's platform,
//! 3. the generic removal-phrase scan,
//! 4. the default (`Live`, or `Indeterminate` for partial markup).
//!
//! Order matters: some platforms serve generic "not found" copy on pages that
//! a platform rule classifies more precisely (a login wall, a private
//! profile), so the platform chain always runs before the generic scan.
//!
//! The classifier is a pure function of its inputs and keeps no history
//! across links.

pub mod phrases;
pub mod rules;

use crate::config::{Config, RuleTable, Timeouts};
use crate::error::Error;
use crate::model::{FetchOutcome, Platform, SocialLink, Verdict, VerdictState};
use phrases::PhraseSet;
use rules::{Hit, Inspection, Rule};
use std::time::Duration;

/// What the rendering session must do before snapshotting a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    /// Unconditional wait after DOM-ready.
    pub settle: Duration,
    /// Selector to wait for (bounded by `marker_wait`) after settling.
    pub await_selector: Option<String>,
    pub marker_wait: Duration,
}

impl RenderPlan {
    /// Snapshot immediately after DOM-ready.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            await_selector: None,
            marker_wait: Duration::ZERO,
        }
    }
}

/// Phrase sets compiled once from the rule table.
#[derive(Debug, Clone)]
pub(crate) struct CompiledPhrases {
    pub removal: PhraseSet,
    pub twitter_protected: PhraseSet,
    pub instagram_not_found: PhraseSet,
    pub instagram_private: PhraseSet,
    pub facebook_unavailable: PhraseSet,
    pub youtube_not_found: PhraseSet,
}

/// The rule-chain classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleTable,
    phrases: CompiledPhrases,
    timeouts: Timeouts,
}

impl Classifier {
    /// Compile the classifier from configuration.
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let rules = config.rules.clone();
        let phrases = CompiledPhrases {
            removal: PhraseSet::new(&rules.removal_phrases)?,
            twitter_protected: PhraseSet::new(&rules.twitter.protected_phrases)?,
            instagram_not_found: PhraseSet::new(&rules.instagram.not_found_phrases)?,
            instagram_private: PhraseSet::new(&rules.instagram.private_phrases)?,
            facebook_unavailable: PhraseSet::new(&rules.facebook.unavailable_phrases)?,
            youtube_not_found: PhraseSet::new(&rules.youtube.not_found_phrases)?,
        };
        Ok(Self {
            rules,
            phrases,
            timeouts: config.timeouts.clone(),
        })
    }

    /// Version of the rule table stamped on every verdict.
    pub fn rules_version(&self) -> u32 {
        self.rules.version
    }

    pub(crate) fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub(crate) fn phrases(&self) -> &CompiledPhrases {
        &self.phrases
    }

    /// Settle delay and marker wait the session applies for this link.
    pub fn render_plan(&self, link: &SocialLink) -> RenderPlan {
        match link.platform() {
            Platform::Twitter => RenderPlan {
                settle: self.timeouts.settle(),
                await_selector: Some(self.rules.twitter.primary_column_selector.clone()),
                marker_wait: self.timeouts.marker_wait(),
            },
            Platform::Instagram => RenderPlan {
                settle: Duration::ZERO,
                await_selector: Some(self.rules.instagram.profile_header_selector.clone()),
                marker_wait: self.timeouts.marker_wait(),
            },
            _ => RenderPlan::immediate(),
        }
    }

    /// Classify one navigation result. Always produces exactly one verdict.
    pub fn classify(&self, link: &SocialLink, outcome: &FetchOutcome) -> Verdict {
        let inspection = Inspection::new(self, link, outcome);

        let hit = run_chain(rules::GENERAL_CHAIN, &inspection)
            .or_else(|| run_chain(rules::platform_chain(link.platform()), &inspection))
            .or_else(|| run_chain(rules::GENERIC_CHAIN, &inspection))
            .unwrap_or_else(|| default_hit(outcome));

        tracing::debug!(
            "{} [{}] -> {} ({})",
            link.url(),
            link.platform(),
            hit.state,
            hit.evidence
        );

        Verdict::new(link.clone(), hit.state, hit.evidence, self.rules.version)
    }

    /// Verdict for a link whose validation failed before classification.
    pub fn indeterminate(&self, link: &SocialLink, reason: impl Into<String>) -> Verdict {
        Verdict::new(
            link.clone(),
            VerdictState::Indeterminate,
            reason,
            self.rules.version,
        )
    }
}

fn run_chain(chain: &[Rule], inspection: &Inspection<'_>) -> Option<Hit> {
    chain.iter().find_map(|rule| {
        let hit = (rule.check)(inspection)?;
        tracing::trace!("rule {} matched {}", rule.name, inspection.link.url());
        Some(hit)
    })
}

/// Nothing matched: innocent until proven removed, unless the page never
/// finished rendering.
fn default_hit(outcome: &FetchOutcome) -> Hit {
    if outcome.timed_out {
        Hit::new(
            VerdictState::Indeterminate,
            "render timed out; partial markup showed no removal cues",
        )
    } else {
        Hit::new(VerdictState::Live, "no removal cues found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(&Config::default()).unwrap()
    }

    fn outcome(url: &str, status: Option<u16>, markup: &str) -> FetchOutcome {
        FetchOutcome {
            requested_url: url.to_string(),
            status_code: status,
            final_url: url.to_string(),
            rendered_markup: Some(markup.to_string()),
            timed_out: false,
            transport_error: None,
            ..Default::default()
        }
    }

    fn link(url: &str, platform: Platform) -> SocialLink {
        SocialLink::new("acme.org", url, platform)
    }

    #[test]
    fn test_404_always_not_found() {
        let c = classifier();
        let cases = [
            (Platform::Instagram, "<header><section>profile</section></header>"),
            (Platform::Twitter, r#"<div data-testid="primaryColumn">hi</div>"#),
            (Platform::Flickr, "Account suspended"),
            (Platform::Unknown, ""),
        ];
        for (platform, markup) in cases {
            let l = link("https://example.com/acme", platform);
            let v = c.classify(&l, &outcome(l.url(), Some(404), markup));
            assert_eq!(v.state, VerdictState::NotFound, "{platform}");
            assert_eq!(v.evidence, "404 status");
        }
    }

    #[test]
    fn test_generic_phrase_scan_removed() {
        let c = classifier();
        let l = link("https://www.flickr.com/photos/acme", Platform::Flickr);
        let v = c.classify(
            &l,
            &outcome(l.url(), Some(200), "<p>Account Suspended for violations</p>"),
        );
        assert_eq!(v.state, VerdictState::Removed);
        assert!(v.evidence.contains("Account suspended"));
    }

    #[test]
    fn test_default_live() {
        let c = classifier();
        let l = link("https://www.flickr.com/photos/acme", Platform::Flickr);
        let v = c.classify(&l, &outcome(l.url(), Some(200), "<p>Photos by Acme</p>"));
        assert_eq!(v.state, VerdictState::Live);
        assert_eq!(v.rules_version, c.rules_version());
    }

    #[test]
    fn test_transport_error_without_markup_indeterminate() {
        let c = classifier();
        let l = link("https://www.flickr.com/photos/acme", Platform::Flickr);
        let mut o = FetchOutcome::new(l.url());
        o.transport_error = Some("dns error: no such host".into());
        let v = c.classify(&l, &o);
        assert_eq!(v.state, VerdictState::Indeterminate);
        assert_eq!(v.evidence, "dns error: no such host");
    }

    #[test]
    fn test_timeout_without_markup_indeterminate() {
        let c = classifier();
        let l = link("https://www.flickr.com/photos/acme", Platform::Flickr);
        let mut o = FetchOutcome::new(l.url());
        o.timed_out = true;
        let v = c.classify(&l, &o);
        assert_eq!(v.state, VerdictState::Indeterminate);
        assert!(v.evidence.contains("timed out"));
    }

    #[test]
    fn test_timeout_with_partial_markup_still_scans() {
        let c = classifier();
        let l = link("https://www.flickr.com/photos/acme", Platform::Flickr);
        let mut o = outcome(l.url(), Some(200), "<h1>Page not found</h1>");
        o.timed_out = true;
        assert_eq!(c.classify(&l, &o).state, VerdictState::Removed);

        o.rendered_markup = Some("<h1>Acme</h1>".into());
        assert_eq!(c.classify(&l, &o).state, VerdictState::Indeterminate);
    }

    #[test]
    fn test_blocked_status() {
        let c = classifier();
        let l = link("https://www.linkedin.com/company/acme", Platform::LinkedIn);
        let v = c.classify(&l, &outcome(l.url(), Some(999), "<html></html>"));
        assert_eq!(v.state, VerdictState::RateLimitedOrBlocked);
        assert!(v.evidence.contains("999"));
    }

    #[test]
    fn test_precheck_block_ignored_when_page_rendered() {
        let c = classifier();
        let l = link(
            "https://www.linkedin.com/company/unavailable/",
            Platform::LinkedIn,
        );
        let mut o = outcome(l.url(), None, "<h1>This LinkedIn Page isn't available</h1>");
        o.precheck_status = Some(999);
        let v = c.classify(&l, &o);
        assert_eq!(v.state, VerdictState::NotFound);
        assert!(v.evidence.contains("unavailable"));

        let l = link("https://www.instagram.com/acme/", Platform::Instagram);
        let mut o = outcome(l.url(), None, "<main><header><section>acme</section></header></main>");
        o.precheck_status = Some(429);
        assert_eq!(c.classify(&l, &o).state, VerdictState::Live);
    }

    #[test]
    fn test_precheck_block_counts_when_nothing_rendered() {
        let c = classifier();
        let l = link("https://www.linkedin.com/company/acme", Platform::LinkedIn);
        let mut o = outcome(l.url(), None, "");
        o.rendered_markup = None;
        o.timed_out = true;
        o.precheck_status = Some(999);
        let v = c.classify(&l, &o);
        assert_eq!(v.state, VerdictState::Indeterminate);

        o.timed_out = false;
        let v = c.classify(&l, &o);
        assert_eq!(v.state, VerdictState::RateLimitedOrBlocked);
        assert!(v.evidence.contains("999"));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = classifier();
        let l = link("https://www.instagram.com/acme/", Platform::Instagram);
        let mut o = outcome(l.url(), Some(200), "<p>Account suspended</p>");
        o.final_url = "https://www.instagram.com/accounts/login/?next=/acme/".into();
        let first = c.classify(&l, &o);
        let second = c.classify(&l, &o);
        assert_eq!(first.state, second.state);
        assert_eq!(first.evidence, second.evidence);
    }

    #[test]
    fn test_render_plan_per_platform() {
        let c = classifier();
        let tw = c.render_plan(&link("https://x.com/acme", Platform::Twitter));
        assert_eq!(tw.settle, Duration::from_millis(5_000));
        assert_eq!(
            tw.await_selector.as_deref(),
            Some(r#"[data-testid="primaryColumn"]"#)
        );

        let fb = c.render_plan(&link("https://facebook.com/acme", Platform::Facebook));
        assert_eq!(fb, RenderPlan::immediate());
    }
}
