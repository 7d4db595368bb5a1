//! Text-only heading detection.
//!
//! A line is tried against an ordered list of matchers (numbered, all-caps,
//! appendix, standalone ignore label); the first one that accepts wins.
//! Matchers are pure: they read the detector configuration and the shared
//! ignore-label set, nothing else.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::{DetectorConfig, HeadingDialect};
use crate::error::{Error, Result};
use crate::labels::IgnoreLabels;
use crate::logging::HEADING;

static STRICT_NUMBERED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<number>[0-9]+(?:\.[0-9]+)*)\.?\s+(?P<title>[A-Za-z][^\n:]*[A-Za-z]+)$")
        .unwrap()
});
static LOOSE_NUMBERED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<number>[0-9]+(?:\.[0-9]+)*)\.?(?:\s*[)\-–—:]|\s+)(?P<title>.+)$").unwrap()
});
static ALL_CAPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-ZÄÖÜ][A-Z0-9ÄÖÜß\s/-]{3,}$").unwrap());
static APPENDIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^appendix\s+(?P<letter>[a-z]):\s*(?P<title>.+)$").unwrap());
static DOT_LEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());
static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^###(?:\{(?P<number>[^}]*)\})?(?:\[(?P<title>.*)\])?$").unwrap()
});

/// Appendix letters are numbered after this so they sort behind chapters.
const APPENDIX_NUMBER_BASE: u32 = 10;
const MIN_TITLE_CHARS: usize = 3;
const MAX_PAGE_REFERENCE_DIGITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingKind {
    Numbered,
    AllCaps,
    Appendix,
    Label,
}

impl fmt::Display for HeadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeadingKind::Numbered => "numbered",
            HeadingKind::AllCaps => "all-caps",
            HeadingKind::Appendix => "appendix",
            HeadingKind::Label => "label",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub kind: HeadingKind,
    pub level: usize,
    /// Dotted number, empty for unnumbered headings.
    pub number: String,
    pub title: String,
}

impl Heading {
    fn unnumbered(kind: HeadingKind, title: String) -> Self {
        Heading {
            kind,
            level: 1,
            number: String::new(),
            title,
        }
    }
}

type Matcher = fn(&HeadingDetector<'_>, &str, u32) -> Result<Option<Heading>>;

/// Evaluated in this order; the first match wins.
const MATCHERS: &[(HeadingKind, Matcher)] = &[
    (HeadingKind::Numbered, match_numbered),
    (HeadingKind::AllCaps, match_all_caps),
    (HeadingKind::Appendix, match_appendix),
    (HeadingKind::Label, match_label),
];

#[derive(Debug, Clone)]
pub struct HeadingDetector<'a> {
    config: DetectorConfig,
    labels: &'a IgnoreLabels,
}

impl<'a> HeadingDetector<'a> {
    pub fn new(config: DetectorConfig, labels: &'a IgnoreLabels) -> Self {
        Self { config, labels }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn labels(&self) -> &'a IgnoreLabels {
        self.labels
    }

    /// Classify one line. `Ok(None)` means body text; `Err` is reserved for
    /// lines that cannot be evaluated at all (e.g. a section number too large
    /// to represent).
    pub fn detect(&self, line: &str, page_number: u32) -> Result<Option<Heading>> {
        let stripped = line.trim();
        if stripped.is_empty() {
            return Ok(None);
        }
        for (kind, matcher) in MATCHERS {
            if *kind == HeadingKind::AllCaps && !self.config.detect_all_caps {
                continue;
            }
            if let Some(heading) = matcher(self, stripped, page_number)? {
                debug!(
                    target: HEADING,
                    page = page_number,
                    kind = %heading.kind,
                    number = %heading.number,
                    title = %heading.title,
                    "Heading candidate"
                );
                return Ok(Some(heading));
            }
        }
        Ok(None)
    }

    fn split_numbered(&self, line: &str) -> Option<(String, String)> {
        match self.config.dialect {
            HeadingDialect::Strict => {
                let caps = STRICT_NUMBERED_RE.captures(line)?;
                Some((caps["number"].to_string(), caps["title"].trim().to_string()))
            }
            HeadingDialect::Loose => {
                let caps = LOOSE_NUMBERED_RE.captures(line)?;
                let number = caps["number"].to_string();
                let title = caps["title"]
                    .trim_matches(|c: char| matches!(c, ' ' | '\t' | '-' | '–' | '—' | ':' | ')'))
                    .to_string();
                Some((number, title))
            }
        }
    }

    /// Whole tokens only, so "Systems" is not mistaken for milliseconds;
    /// a unit glued to a number ("100ms") counts too.
    fn contains_unit(&self, title: &str) -> bool {
        title.split_whitespace().any(|raw| {
            let token = raw
                .trim_matches(|c: char| matches!(c, ',' | ';' | '.' | '(' | ')' | '[' | ']' | ':'))
                .to_lowercase();
            self.config.unit_tokens.iter().any(|unit| {
                token == *unit
                    || token.strip_suffix(unit.as_str()).is_some_and(|value| {
                        !value.is_empty()
                            && value.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
                    })
            })
        })
    }

    /// Collapse dot leaders and drop a trailing page number. The flag is set
    /// when that number points away from the current page, which marks a
    /// table-of-contents entry rather than a heading.
    fn strip_page_reference(&self, title: &str, page_number: u32) -> (String, bool) {
        let cleaned = DOT_LEADER_RE.replace_all(title, " ");
        let cleaned = MULTI_SPACE_RE.replace_all(&cleaned, " ");
        let cleaned = cleaned.trim();

        if let Some((head, tail)) = cleaned.rsplit_once(' ') {
            let tail = tail.trim().trim_end_matches(['.', ':', ')']);
            if !tail.is_empty()
                && tail.len() <= MAX_PAGE_REFERENCE_DIGITS
                && tail.chars().all(|c| c.is_ascii_digit())
            {
                let referenced: u32 = tail.parse().unwrap_or_default();
                let head = head.trim().to_string();
                return if referenced.abs_diff(page_number) > self.config.page_reference_tolerance {
                    (head, true)
                } else {
                    (head, false)
                };
            }
        }
        (cleaned.to_string(), false)
    }
}

/// `1.2 Title`, in the configured dialect, followed by the sanity checks.
pub fn match_numbered(
    detector: &HeadingDetector<'_>,
    line: &str,
    page_number: u32,
) -> Result<Option<Heading>> {
    let Some((number, raw_title)) = detector.split_numbered(line) else {
        return Ok(None);
    };

    if detector.contains_unit(&raw_title) {
        debug!(target: HEADING, line, "Rejected: measurement unit in title");
        return Ok(None);
    }

    let first = number.split('.').next().unwrap_or_default();
    let first: u32 = first.parse().map_err(|_| Error::InvalidSectionNumber {
        number: number.clone(),
    })?;
    if first > detector.config.max_chapter_number {
        debug!(target: HEADING, line, first, "Rejected: chapter number out of range");
        return Ok(None);
    }

    let (title, toc_reference) = detector.strip_page_reference(&raw_title, page_number);
    if toc_reference {
        debug!(target: HEADING, line, "Rejected: table-of-contents entry");
        return Ok(None);
    }
    if title.chars().count() < MIN_TITLE_CHARS {
        return Ok(None);
    }
    if !title.chars().last().is_some_and(char::is_alphabetic) {
        return Ok(None);
    }
    if !title.chars().any(char::is_alphabetic) {
        return Ok(None);
    }

    Ok(Some(Heading {
        kind: HeadingKind::Numbered,
        level: number.split('.').count(),
        number,
        title,
    }))
}

/// Upper-case line of at least four characters, always level 1.
pub fn match_all_caps(
    detector: &HeadingDetector<'_>,
    line: &str,
    page_number: u32,
) -> Result<Option<Heading>> {
    if !ALL_CAPS_RE.is_match(line) {
        return Ok(None);
    }
    let (title, toc_reference) = detector.strip_page_reference(line, page_number);
    if toc_reference || title.is_empty() {
        return Ok(None);
    }
    Ok(Some(Heading::unnumbered(HeadingKind::AllCaps, title)))
}

/// `Appendix B: Title`, numbered 12 so it sorts after ordinary chapters.
pub fn match_appendix(
    _detector: &HeadingDetector<'_>,
    line: &str,
    _page_number: u32,
) -> Result<Option<Heading>> {
    let Some(caps) = APPENDIX_RE.captures(line) else {
        return Ok(None);
    };
    let letter = &caps["letter"];
    let title = caps["title"].trim();
    if title.chars().count() < MIN_TITLE_CHARS {
        return Ok(None);
    }
    // (?i) also folds a few non-ASCII look-alikes (the Kelvin sign) into [a-z].
    let Some(letter_char) = letter.chars().next().filter(char::is_ascii_alphabetic) else {
        return Ok(None);
    };
    let position = letter_char.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
    Ok(Some(Heading {
        kind: HeadingKind::Appendix,
        level: 1,
        number: (APPENDIX_NUMBER_BASE + position).to_string(),
        title: format!("Appendix {letter}: {title}"),
    }))
}

/// A bare line naming an ignored section ("Inhaltsverzeichnis"), so the
/// suppression logic can act on it without numbering or capitals.
pub fn match_label(
    detector: &HeadingDetector<'_>,
    line: &str,
    _page_number: u32,
) -> Result<Option<Heading>> {
    if detector.labels.matches_label(line) {
        return Ok(Some(Heading::unnumbered(HeadingKind::Label, line.to_string())));
    }
    Ok(None)
}

/// Render a heading as `###{number}[title]`, omitting absent parts.
pub fn format_heading(number: &str, title: &str) -> String {
    let number = number.trim();
    let title = title.trim();
    match (number.is_empty(), title.is_empty()) {
        (false, false) => format!("###{{{number}}}[{title}]"),
        (false, true) => format!("###{{{number}}}"),
        (true, false) => format!("###[{title}]"),
        (true, true) => String::new(),
    }
}

/// Inverse of [`format_heading`]: `(number, title)` with empty strings for
/// absent parts, or `None` when the line is not a marker.
pub fn parse_heading_marker(line: &str) -> Option<(String, String)> {
    let caps = MARKER_RE.captures(line.trim())?;
    let number = caps.name("number").map(|m| m.as_str().to_string());
    let title = caps.name("title").map(|m| m.as_str().to_string());
    if number.is_none() && title.is_none() {
        return None;
    }
    Some((number.unwrap_or_default(), title.unwrap_or_default()))
}
