//! Section-title normalisation and the ignore-label set.
//!
//! The set is built once per run (built-in defaults plus an optional JSON
//! file) and is read-only afterwards, so a single instance can be shared by
//! every document processed in parallel.

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::logging::PIPELINE;

static BRACKET_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[[^\]]+\]\s*").unwrap());
static NUMBER_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+(?:\.[0-9]+)*\.?\s*").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Labels ignored even without a config file.
pub const DEFAULT_IGNORE_SECTION_NAMES: &[&str] = &[
    "change history",
    "revision history",
    "summary of changes",
    "änderungshistorie",
    "änderungsverlauf",
    "historique des modifications",
    "historique",
    "table of contents",
    "contents",
    "table des matières",
    "sommaire",
    "inhalt",
    "inhaltsverzeichnis",
    "verzeichnis",
];

/// Lines at the top of a raw page checked by [`IgnoreLabels::should_skip_page`].
const SKIP_PAGE_SCAN_LINES: usize = 10;

/// Canonical form of a section title: leading `[tag]` and `1.2.3` prefixes
/// removed, whitespace collapsed, lowercased.
pub fn normalize_label(label: &str) -> String {
    let mut cleaned = label.trim();
    // Prefixes can be stacked ("[A] 1.2 Title"); strip until nothing changes.
    loop {
        let before = cleaned.len();
        if let Some(m) = BRACKET_TAG_RE.find(cleaned) {
            cleaned = cleaned[m.end()..].trim_start();
        }
        if let Some(m) = NUMBER_PREFIX_RE.find(cleaned) {
            cleaned = cleaned[m.end()..].trim_start();
        }
        if cleaned.len() == before {
            break;
        }
    }
    WHITESPACE_RE
        .replace_all(cleaned, " ")
        .to_lowercase()
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreLabels {
    labels: BTreeSet<String>,
}

impl IgnoreLabels {
    /// Normalise and collect labels, dropping the ones that normalise to nothing.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = values
            .into_iter()
            .map(|value| normalize_label(value.as_ref()))
            .filter(|label| !label.is_empty())
            .collect();
        IgnoreLabels { labels }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_IGNORE_SECTION_NAMES)
    }

    /// Defaults merged with the labels in `config_path`. A missing or
    /// malformed file is reported and contributes nothing.
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut labels = Self::with_defaults();
        if let Some(path) = config_path {
            match read_label_file(path) {
                Ok(extra) => {
                    debug!(target: PIPELINE, path = %path.display(), count = extra.len(), "Loaded ignore labels");
                    labels.extend(extra);
                }
                Err(e) => {
                    warn!(target: PIPELINE, path = %path.display(), error = %e, "Ignoring unusable ignore-label config");
                }
            }
        }
        labels
    }

    pub fn extend<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.labels.extend(Self::new(values).labels);
    }

    /// Exact membership of an already normalised label.
    pub fn contains(&self, normalized: &str) -> bool {
        self.labels.contains(normalized)
    }

    /// Membership of a raw line after normalisation.
    pub fn matches_label(&self, raw: &str) -> bool {
        self.contains(&normalize_label(raw))
    }

    /// Whether a detected heading names a section to suppress. Both the full
    /// heading (`number title`) and the bare title are tried.
    pub fn matches_heading(&self, number: &str, title: &str) -> bool {
        let heading = [number.trim(), title.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        [heading.as_str(), title]
            .iter()
            .any(|candidate| {
                self.contains(candidate.trim().to_lowercase().as_str())
                    || self.matches_label(candidate)
            })
    }

    /// A page opening with an ignore-label line (within its first ten raw
    /// lines) is dropped wholesale.
    pub fn should_skip_page(&self, raw_text: &str) -> bool {
        raw_text
            .lines()
            .take(SKIP_PAGE_SCAN_LINES)
            .any(|line| self.matches_label(line))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// Raw labels from a JSON file: either `{"ignore_sections": [...]}` or a bare
/// list, whose entries are strings or objects carrying `label`, `name` or
/// `value`.
pub fn read_label_file(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(raw.trim_start_matches('\u{feff}'))?;

    let entries = match &data {
        Value::Object(map) => match map.get("ignore_sections") {
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(Value::Null) | None => &[],
            Some(_) => {
                return Err(Error::Config {
                    path: path.to_path_buf(),
                    reason: "`ignore_sections` must be a list".to_string(),
                })
            }
        },
        Value::Array(entries) => entries.as_slice(),
        _ => {
            return Err(Error::Config {
                path: path.to_path_buf(),
                reason: "expected an object or a list".to_string(),
            })
        }
    };

    Ok(entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(label) => Some(label.clone()),
            Value::Object(fields) => ["label", "name", "value"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str))
                .map(str::to_string),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_number_prefixes() {
        assert_eq!(normalize_label("  [DRAFT]  3.2   Change   History "), "change history");
        assert_eq!(normalize_label("1. Introduction"), "introduction");
        assert_eq!(normalize_label("Änderungshistorie"), "änderungshistorie");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "[A] [B] 1 2 Title",
            "  1.2.3   Real   time ",
            "[x]1.2 [y] Mixed",
            "",
            "   ",
            "9.",
            "ÄNDERUNGSVERLAUF",
            "1.2.x title",
        ];
        for sample in samples {
            let once = normalize_label(sample);
            assert_eq!(normalize_label(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn matches_heading_uses_title_and_full_heading() {
        let labels = IgnoreLabels::new(["Change History"]);
        assert!(labels.matches_heading("", "CHANGE HISTORY"));
        assert!(labels.matches_heading("7", "Change history"));
        assert!(!labels.matches_heading("7", "Design"));
    }

    #[test]
    fn skip_page_only_checks_leading_lines() {
        let labels = IgnoreLabels::with_defaults();
        assert!(labels.should_skip_page("Inhaltsverzeichnis\n1 Einleitung 3"));
        let late = format!("{}Contents", "text\n".repeat(12));
        assert!(!labels.should_skip_page(&late));
    }
}
