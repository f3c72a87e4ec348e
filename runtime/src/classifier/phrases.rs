//! Case-insensitive phrase matching with word-boundary precision.
//!
//! Each phrase compiles to one regex. Edges that are word characters get a
//! `\b` anchor so "404" never fires inside "14045" and "Page not found" never
//! fires inside "Page not founded". Apostrophes match their straight,
//! typographic, and entity-encoded spellings, and runs of whitespace match
//! any whitespace run.

use crate::error::Error;
use regex::Regex;

const APOSTROPHE: &str = r"(?:'|’|‘|&#39;|&#x27;|&apos;)";

/// A compiled set of phrases, checked in configuration order.
#[derive(Debug, Clone)]
pub struct PhraseSet {
    entries: Vec<(String, Regex)>,
}

impl PhraseSet {
    pub fn new(phrases: &[String]) -> Result<Self, Error> {
        let entries = phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| {
                Regex::new(&phrase_pattern(p))
                    .map(|re| (p.to_string(), re))
                    .map_err(|e| Error::Config(format!("bad phrase {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// First configured phrase found in `haystack`.
    pub fn find(&self, haystack: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, re)| re.is_match(haystack))
            .map(|(phrase, _)| phrase.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn phrase_pattern(phrase: &str) -> String {
    let mut pattern = String::from("(?i)");
    if phrase.chars().next().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }

    let mut in_space = false;
    for c in phrase.chars() {
        if c.is_whitespace() {
            if !in_space {
                pattern.push_str(r"\s+");
                in_space = true;
            }
            continue;
        }
        in_space = false;
        match c {
            '\'' | '’' | '‘' => pattern.push_str(APOSTROPHE),
            _ => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }

    if phrase.chars().last().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(phrases: &[&str]) -> PhraseSet {
        let owned: Vec<String> = phrases.iter().map(|s| s.to_string()).collect();
        PhraseSet::new(&owned).unwrap()
    }

    #[test]
    fn test_case_insensitive_match() {
        let s = set(&["Account suspended"]);
        assert_eq!(s.find("<span>ACCOUNT SUSPENDED</span>"), Some("Account suspended"));
    }

    #[test]
    fn test_word_boundary_prevents_partial_words() {
        let s = set(&["404", "Page not found"]);
        assert_eq!(s.find("build 14045 ok"), None);
        assert_eq!(s.find("Page not founded in 1999"), None);
        assert_eq!(s.find("error 404."), Some("404"));
        assert_eq!(s.find("<h1>Page not found</h1>"), Some("Page not found"));
    }

    #[test]
    fn test_apostrophe_variants() {
        let s = set(&["This account doesn't exist"]);
        assert!(s.find("This account doesn’t exist").is_some());
        assert!(s.find("This account doesn&#39;t exist").is_some());
        assert!(s.find("This account doesn't exist").is_some());
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        let s = set(&["Sorry, this page isn't available"]);
        assert!(s.find("Sorry,\n   this page\tisn't available").is_some());
    }

    #[test]
    fn test_trailing_punctuation_has_no_boundary() {
        let s = set(&["The Page you're searching for no longer exists."]);
        assert!(s
            .find("The Page you're searching for no longer exists.Try again")
            .is_some());
    }

    #[test]
    fn test_first_configured_phrase_wins() {
        let s = set(&["Page not found", "not found"]);
        assert_eq!(s.find("page not found"), Some("Page not found"));
    }

    #[test]
    fn test_blank_phrases_skipped() {
        let s = set(&["", "   ", "gone"]);
        assert_eq!(s.len(), 1);
    }
}
