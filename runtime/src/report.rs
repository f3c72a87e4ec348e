//! Input lists and report files.
//!
//! Inputs are read as header-less CSV: the first column is used, blank lines
//! and `#` comments are skipped, and a leading header row is tolerated.

use crate::acquisition::liveness::{with_scheme, LivenessResult};
use crate::error::Error;
use crate::model::{detect_platform, LinkSet, Platform, PlatformKeyword, SocialLink, Verdict, VerdictState};
use crate::pipeline::source_domain;
use chrono::{DateTime, TimeZone};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Header of the verdict report.
pub const VERDICT_HEADER: [&str; 3] = ["Source Domain", "Social Link", "Status"];
/// Header of the scrape report.
pub const LINKS_HEADER: [&str; 2] = ["Source Domain", "Social Link"];

const HEADER_CELLS: &[&str] = &["domain", "domains", "url", "urls", "source domain", "social link"];

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn is_header(cell: &str) -> bool {
    HEADER_CELLS.iter().any(|h| cell.eq_ignore_ascii_case(h))
}

/// Read the first column of a domain or URL list.
pub fn read_list<R: Read>(input: R) -> Result<Vec<String>, Error> {
    let mut values = Vec::new();
    for (n, record) in reader(input).records().enumerate() {
        let record = record?;
        let value = record.get(0).unwrap_or_default();
        if value.is_empty() || (n == 0 && is_header(value)) {
            continue;
        }
        values.push(value.to_string());
    }
    Ok(values)
}

pub fn read_list_file(path: &Path) -> Result<Vec<String>, Error> {
    read_list(File::open(path)?)
}

/// Read a links file of `source,link` rows or bare links.
///
/// A bare link's source is its own host. Links are deduplicated the same way
/// extraction results are.
pub fn read_links<R: Read>(input: R, keywords: &[PlatformKeyword], mut set: LinkSet) -> Result<Vec<SocialLink>, Error> {
    for (n, record) in reader(input).records().enumerate() {
        let record = record?;
        let first = record.get(0).unwrap_or_default();
        if n == 0 && is_header(first) {
            continue;
        }
        let (source, link) = match record.get(1).filter(|s| !s.is_empty()) {
            Some(link) => (first.to_string(), with_scheme(link)),
            None if !first.is_empty() => {
                let link = with_scheme(first);
                (source_domain(&link), link)
            }
            None => continue,
        };
        let platform = detect_platform(&link, keywords).unwrap_or(Platform::Unknown);
        set.insert(&source, &link, platform);
    }
    Ok(set.into_links())
}

pub fn read_links_file(path: &Path, keywords: &[PlatformKeyword], set: LinkSet) -> Result<Vec<SocialLink>, Error> {
    read_links(File::open(path)?, keywords, set)
}

/// Write the verdict report: `Source Domain, Social Link, Status`.
pub fn write_verdicts<W: Write>(output: W, verdicts: &[Verdict]) -> Result<(), Error> {
    let mut w = csv::Writer::from_writer(output);
    w.write_record(VERDICT_HEADER)?;
    for v in verdicts {
        w.write_record([
            v.link.source_domains().join("; "),
            v.link.url().to_string(),
            v.status_line(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_verdicts_file(path: &Path, verdicts: &[Verdict]) -> Result<(), Error> {
    write_verdicts(File::create(path)?, verdicts)
}

/// Write the scrape report: `Source Domain, Social Link`.
pub fn write_links<W: Write>(output: W, links: &[SocialLink]) -> Result<(), Error> {
    let mut w = csv::Writer::from_writer(output);
    w.write_record(LINKS_HEADER)?;
    for link in links {
        w.write_record([link.source_domains().join("; ").as_str(), link.url()])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_links_file(path: &Path, links: &[SocialLink]) -> Result<(), Error> {
    write_links(File::create(path)?, links)
}

/// Write reachable URLs, one per line.
pub fn write_reachable<W: Write>(mut output: W, results: &[LivenessResult]) -> io::Result<()> {
    for r in results.iter().filter(|r| r.reachable) {
        writeln!(output, "{}", r.url)?;
    }
    output.flush()
}

pub fn write_reachable_file(path: &Path, results: &[LivenessResult]) -> Result<(), Error> {
    write_reachable(File::create(path)?, results)?;
    Ok(())
}

/// `output_<MM-DD_HH>.csv` for the given local time.
pub fn default_output_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("output_{}.csv", now.format("%m-%d_%H"))
}

/// Verdict counts per state, in report order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub counts: Vec<(VerdictState, usize)>,
}

impl Summary {
    const ORDER: [VerdictState; 7] = [
        VerdictState::Live,
        VerdictState::NotFound,
        VerdictState::Removed,
        VerdictState::PrivateOrRestricted,
        VerdictState::RequiresLogin,
        VerdictState::RateLimitedOrBlocked,
        VerdictState::Indeterminate,
    ];

    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let counts = Self::ORDER
            .iter()
            .map(|&state| (state, verdicts.iter().filter(|v| v.state == state).count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        Self {
            total: verdicts.len(),
            counts,
        }
    }

    pub fn count(&self, state: VerdictState) -> usize {
        self.counts
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn problems(&self) -> usize {
        self.counts
            .iter()
            .filter(|(s, _)| s.is_problem())
            .map(|(_, n)| n)
            .sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} link(s)", self.total)?;
        for (state, n) in &self.counts {
            write!(f, ", {n} {}", state.label())?;
        }
        Ok(())
    }
}
