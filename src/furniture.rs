//! Page furniture removal: running headers/footers learned across pages,
//! fixed boilerplate lines and table-of-contents pages.

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::FurnitureConfig;
use crate::error::Result;
use crate::logging::FURNITURE;

const BOILERPLATE_PATTERNS: &[&str] = &[
    r"^se?ite?\s*\d+(?:\s+von\s+\d+)?$",
    r"^©?\s*dr\.?\s*ing\.",
    r"^ege2$",
    r"^guide for software architecture documentation",
    r"^version\s+\d",
    r"^\d{4}-\d{2}-\d{2}$",
];

static NUMBERED_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(?:\.[0-9]+)*\s+.+").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Occurrence counts for one page edge, and the lines that crossed the
/// repeat threshold.
#[derive(Debug, Default)]
struct EdgeProfile {
    counts: IndexMap<String, usize>,
    known: IndexSet<String>,
}

impl EdgeProfile {
    fn observe(&mut self, key: String, min_repeats: usize) {
        let count = self.counts.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count >= min_repeats && self.known.insert(key.clone()) {
            debug!(target: FURNITURE, line = %key, "Learned recurring line");
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.known.contains(key)
    }
}

/// Learns running headers and footers as pages go by. Pages must be fed in
/// order; what is learned on page N applies from page N on and is never
/// forgotten within the document.
#[derive(Debug)]
pub struct PagePreprocessor {
    config: FurnitureConfig,
    boilerplate: Vec<Regex>,
    headers: EdgeProfile,
    footers: EdgeProfile,
}

impl Default for PagePreprocessor {
    fn default() -> Self {
        Self {
            config: FurnitureConfig::default(),
            boilerplate: compile_boilerplate(&[]).unwrap_or_default(),
            headers: EdgeProfile::default(),
            footers: EdgeProfile::default(),
        }
    }
}

fn compile_boilerplate(extra: &[String]) -> Result<Vec<Regex>> {
    BOILERPLATE_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .chain(extra.iter().cloned())
        .map(|pattern| Regex::new(&format!("(?i){pattern}")).map_err(Into::into))
        .collect()
}

fn normalise_line(line: &str) -> String {
    WHITESPACE_RE.replace_all(line.trim(), " ").to_lowercase()
}

impl PagePreprocessor {
    pub fn new(config: FurnitureConfig) -> Result<Self> {
        let boilerplate = compile_boilerplate(&config.extra_boilerplate_patterns)?;
        Ok(Self {
            config,
            boilerplate,
            headers: EdgeProfile::default(),
            footers: EdgeProfile::default(),
        })
    }

    /// Strip furniture from one page. Returns an empty string for pages that
    /// look like a table of contents.
    pub fn clean_page(&mut self, text: &str, page_number: u32) -> String {
        if text.is_empty() {
            return String::new();
        }
        let lines: Vec<&str> = text.lines().collect();
        self.update_profiles(&lines);

        if self.looks_like_toc(&lines, page_number) {
            debug!(target: FURNITURE, page = page_number, "Dropping table-of-contents page");
            return String::new();
        }

        let total = lines.len();
        let mut filtered: Vec<&str> = Vec::with_capacity(total);
        for (idx, line) in lines.iter().enumerate() {
            let stripped = line.trim();
            if stripped.is_empty() {
                filtered.push("");
                continue;
            }
            if self.is_boilerplate(stripped) {
                continue;
            }
            let normalised = normalise_line(stripped);
            if idx < self.config.header_window && self.headers.contains(&normalised) {
                continue;
            }
            if total - idx <= self.config.footer_window && self.footers.contains(&normalised) {
                continue;
            }
            filtered.push(stripped);
        }
        filtered.join("\n").trim().to_string()
    }

    /// Lines currently treated as running headers.
    pub fn known_headers(&self) -> impl Iterator<Item = &str> {
        self.headers.known.iter().map(String::as_str)
    }

    /// Lines currently treated as running footers.
    pub fn known_footers(&self) -> impl Iterator<Item = &str> {
        self.footers.known.iter().map(String::as_str)
    }

    fn is_boilerplate(&self, line: &str) -> bool {
        self.boilerplate.iter().any(|re| re.is_match(line))
    }

    fn update_profiles(&mut self, lines: &[&str]) {
        let min_repeats = self.config.min_repeats;
        let header_end = self.config.header_window.min(lines.len());
        let footer_start = lines.len().saturating_sub(self.config.footer_window);

        for line in lines[..header_end].iter().filter(|l| !l.trim().is_empty()) {
            self.headers.observe(normalise_line(line), min_repeats);
        }
        for line in lines[footer_start..].iter().filter(|l| !l.trim().is_empty()) {
            self.footers.observe(normalise_line(line), min_repeats);
        }
    }

    fn looks_like_toc(&self, lines: &[&str], page_number: u32) -> bool {
        if lines.is_empty() {
            return false;
        }
        let limit = self.config.toc_scan_min_lines.max(2 * lines.len() / 3);
        let prefix = lines
            .iter()
            .take(limit)
            .map(|line| line.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        if self
            .config
            .toc_title_tokens
            .iter()
            .any(|token| prefix.contains(token.as_str()))
        {
            return true;
        }

        if page_number <= self.config.toc_scan_pages {
            let numbered = lines
                .iter()
                .filter(|line| NUMBERED_ENTRY_RE.is_match(line.trim()))
                .count();
            if numbered >= 6.max(lines.len() / 2) {
                return true;
            }
        }
        false
    }
}
