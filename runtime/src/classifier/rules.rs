//! Rule chains. Each chain is an ordered slice; the first rule that returns a
//! hit decides the verdict.

use super::Classifier;
use crate::model::{FetchOutcome, Platform, SocialLink, VerdictState};
use scraper::{Html, Selector};
use url::Url;

/// A rule's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub state: VerdictState,
    pub evidence: String,
}

impl Hit {
    pub fn new(state: VerdictState, evidence: impl Into<String>) -> Self {
        Self {
            state,
            evidence: evidence.into(),
        }
    }
}

/// A named rule in a chain.
pub struct Rule {
    pub name: &'static str,
    pub check: fn(&Inspection<'_>) -> Option<Hit>,
}

/// Everything a rule may look at for one link.
pub struct Inspection<'a> {
    pub classifier: &'a Classifier,
    pub link: &'a SocialLink,
    pub outcome: &'a FetchOutcome,
    /// Path of the submitted link.
    link_path: String,
    final_url: Option<Url>,
}

impl<'a> Inspection<'a> {
    pub fn new(classifier: &'a Classifier, link: &'a SocialLink, outcome: &'a FetchOutcome) -> Self {
        Self {
            classifier,
            link,
            outcome,
            link_path: link.path().to_ascii_lowercase(),
            final_url: Url::parse(&outcome.final_url).ok(),
        }
    }

    fn markup(&self) -> Option<&str> {
        self.outcome.markup()
    }

    /// Lowercased path of the final (post-redirect) URL.
    fn final_path(&self) -> String {
        self.final_url
            .as_ref()
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Whether the rendered markup contains an element matching `selector`.
    fn has_element(&self, selector: &str) -> bool {
        let (Some(markup), Ok(selector)) = (self.markup(), Selector::parse(selector)) else {
            return false;
        };
        Html::parse_document(markup)
            .select(&selector)
            .next()
            .is_some()
    }
}

/// Find the first segment from `segments` present in `path` as whole path
/// components: `/404` matches `/404` and `/404/x` but not `/4040`.
fn find_segment<'s>(path: &str, segments: &'s [String]) -> Option<&'s str> {
    segments.iter().map(String::as_str).find(|seg| {
        let seg = seg.trim_end_matches('/');
        !seg.is_empty()
            && path.match_indices(seg).any(|(i, _)| {
                matches!(path[i + seg.len()..].chars().next(), None | Some('/'))
            })
    })
}

// ── General chain ──────────────────────────────────────────────────────────

pub const GENERAL_CHAIN: &[Rule] = &[
    Rule {
        name: "general.status_404",
        check: status_404,
    },
    Rule {
        name: "general.transport_error",
        check: transport_error_without_markup,
    },
    Rule {
        name: "general.render_timeout",
        check: timed_out_without_markup,
    },
    Rule {
        name: "general.blocked_status",
        check: blocked_status,
    },
];

fn status_404(i: &Inspection<'_>) -> Option<Hit> {
    (i.outcome.status_code == Some(404)).then(|| Hit::new(VerdictState::NotFound, "404 status"))
}

fn transport_error_without_markup(i: &Inspection<'_>) -> Option<Hit> {
    let error = i.outcome.transport_error.as_deref()?;
    i.markup()
        .is_none()
        .then(|| Hit::new(VerdictState::Indeterminate, error))
}

fn timed_out_without_markup(i: &Inspection<'_>) -> Option<Hit> {
    (i.outcome.timed_out && i.markup().is_none())
        .then(|| Hit::new(VerdictState::Indeterminate, "render timed out before DOM ready"))
}

fn blocked_status(i: &Inspection<'_>) -> Option<Hit> {
    let blocked = &i.classifier.rules().blocked_statuses;
    let status = i
        .outcome
        .status_code
        .filter(|s| blocked.contains(s))
        .or_else(|| {
            // A browser render that produced markup outranks the pre-check.
            i.outcome
                .precheck_status
                .filter(|s| blocked.contains(s) && i.markup().is_none())
        })?;
    Some(Hit::new(
        VerdictState::RateLimitedOrBlocked,
        format!("{status} status, request throttled or blocked"),
    ))
}

// ── Generic chain ──────────────────────────────────────────────────────────

pub const GENERIC_CHAIN: &[Rule] = &[Rule {
    name: "generic.removal_phrase",
    check: generic_removal_phrase,
}];

fn generic_removal_phrase(i: &Inspection<'_>) -> Option<Hit> {
    let phrase = i.classifier.phrases().removal.find(i.markup()?)?;
    Some(Hit::new(
        VerdictState::Removed,
        format!("'{phrase}' found on page"),
    ))
}

// ── Platform chains ────────────────────────────────────────────────────────

/// The ordered chain for a platform. Flickr and unknown hosts have none.
pub fn platform_chain(platform: Platform) -> &'static [Rule] {
    match platform {
        Platform::Twitter => TWITTER_CHAIN,
        Platform::LinkedIn => LINKEDIN_CHAIN,
        Platform::Instagram => INSTAGRAM_CHAIN,
        Platform::Facebook => FACEBOOK_CHAIN,
        Platform::YouTube => YOUTUBE_CHAIN,
        Platform::Flickr | Platform::Unknown => &[],
    }
}

const TWITTER_CHAIN: &[Rule] = &[
    Rule {
        name: "twitter.primary_column_missing",
        check: twitter_primary_column_missing,
    },
    Rule {
        name: "twitter.protected",
        check: twitter_protected,
    },
];

fn twitter_primary_column_missing(i: &Inspection<'_>) -> Option<Hit> {
    // A partial render proves nothing by what it lacks.
    if i.outcome.timed_out {
        return None;
    }
    i.markup()?;
    let selector = &i.classifier.rules().twitter.primary_column_selector;
    (!i.has_element(selector)).then(|| {
        Hit::new(
            VerdictState::Removed,
            "primary column missing after settle delay, account likely doesn't exist",
        )
    })
}

fn twitter_protected(i: &Inspection<'_>) -> Option<Hit> {
    let phrase = i.classifier.phrases().twitter_protected.find(i.markup()?)?;
    Some(Hit::new(
        VerdictState::PrivateOrRestricted,
        format!("'{phrase}' found on page"),
    ))
}

const LINKEDIN_CHAIN: &[Rule] = &[
    Rule {
        name: "linkedin.not_found_redirect",
        check: linkedin_not_found_redirect,
    },
    Rule {
        name: "linkedin.profile_login_wall",
        check: linkedin_profile_login_wall,
    },
];

fn linkedin_not_found_redirect(i: &Inspection<'_>) -> Option<Hit> {
    let rules = &i.classifier.rules().linkedin;
    let segment = find_segment(&i.final_path(), &rules.not_found_segments)?;
    Some(Hit::new(
        VerdictState::NotFound,
        format!("final URL contains '{segment}'"),
    ))
}

fn linkedin_profile_login_wall(i: &Inspection<'_>) -> Option<Hit> {
    let rules = &i.classifier.rules().linkedin;
    let is_profile = rules
        .profile_prefixes
        .iter()
        .any(|p| i.link_path.starts_with(p.as_str()));
    if !is_profile {
        return None;
    }
    let segment = find_segment(&i.final_path(), &rules.login_segments)?;
    Some(Hit::new(
        VerdictState::RequiresLogin,
        format!("profile redirected to login wall '{segment}'"),
    ))
}

const INSTAGRAM_CHAIN: &[Rule] = &[
    Rule {
        name: "instagram.not_found_phrase",
        check: instagram_not_found,
    },
    Rule {
        name: "instagram.private",
        check: instagram_private,
    },
    Rule {
        name: "instagram.profile_header",
        check: instagram_profile_header,
    },
    Rule {
        name: "instagram.login_redirect",
        check: instagram_login_redirect,
    },
];

fn instagram_not_found(i: &Inspection<'_>) -> Option<Hit> {
    let phrase = i.classifier.phrases().instagram_not_found.find(i.markup()?)?;
    Some(Hit::new(
        VerdictState::NotFound,
        format!("'{phrase}' found on page"),
    ))
}

fn instagram_private(i: &Inspection<'_>) -> Option<Hit> {
    let phrase = i.classifier.phrases().instagram_private.find(i.markup()?)?;
    Some(Hit::new(
        VerdictState::PrivateOrRestricted,
        format!("'{phrase}' found on page"),
    ))
}

fn instagram_profile_header(i: &Inspection<'_>) -> Option<Hit> {
    let selector = &i.classifier.rules().instagram.profile_header_selector;
    i.has_element(selector)
        .then(|| Hit::new(VerdictState::Live, "profile header present"))
}

fn instagram_login_redirect(i: &Inspection<'_>) -> Option<Hit> {
    let rules = &i.classifier.rules().instagram;
    let segment = find_segment(&i.final_path(), &rules.login_segments)?;
    Some(Hit::new(
        VerdictState::RequiresLogin,
        format!("no profile header, redirected to '{segment}'"),
    ))
}

const FACEBOOK_CHAIN: &[Rule] = &[
    Rule {
        name: "facebook.unavailable_phrase",
        check: facebook_unavailable,
    },
    Rule {
        name: "facebook.homepage_redirect",
        check: facebook_homepage_redirect,
    },
    Rule {
        name: "facebook.login_redirect",
        check: facebook_login_redirect,
    },
];

fn facebook_unavailable(i: &Inspection<'_>) -> Option<Hit> {
    let phrase = i.classifier.phrases().facebook_unavailable.find(i.markup()?)?;
    Some(Hit::new(
        VerdictState::Removed,
        format!("'{phrase}' found on page"),
    ))
}

fn facebook_homepage_redirect(i: &Inspection<'_>) -> Option<Hit> {
    let final_url = i.final_url.as_ref()?;
    let on_facebook = final_url
        .host_str()
        .is_some_and(|h| h.split('.').any(|label| label == "facebook"));
    let at_root = final_url.path() == "/" && final_url.query().is_none();
    let link_was_root = i.link_path.trim_end_matches('/').is_empty();
    (on_facebook && at_root && !link_was_root).then(|| {
        Hit::new(
            VerdictState::NotFound,
            "redirected to the Facebook homepage",
        )
    })
}

fn facebook_login_redirect(i: &Inspection<'_>) -> Option<Hit> {
    let rules = &i.classifier.rules().facebook;
    if find_segment(&i.link_path, &rules.login_segments).is_some() {
        return None;
    }
    let segment = find_segment(&i.final_path(), &rules.login_segments)?;
    Some(Hit::new(
        VerdictState::RequiresLogin,
        format!("redirected to '{segment}'"),
    ))
}

const YOUTUBE_CHAIN: &[Rule] = &[Rule {
    name: "youtube.channel_not_found",
    check: youtube_channel_not_found,
}];

fn youtube_channel_not_found(i: &Inspection<'_>) -> Option<Hit> {
    let rules = &i.classifier.rules().youtube;
    let is_channel = rules
        .channel_prefixes
        .iter()
        .any(|p| i.link_path.starts_with(p.as_str()));
    if !is_channel {
        return None;
    }
    let phrase = i.classifier.phrases().youtube_not_found.find(i.markup()?)?;
    Some(Hit::new(
        VerdictState::NotFound,
        format!("'{phrase}' found on channel page"),
    ))
}
