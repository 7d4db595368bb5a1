//! Per-page annotation: headings become `###{number}[title]` markers while the
//! aggregator collects the section structure.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::aggregator::SectionAggregator;
use crate::config::AnnotatorConfig;
use crate::error::Result;
use crate::heading::{format_heading, Heading, HeadingDetector};
use crate::logging::ANNOTATE;

static BARE_SECTION_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(?:\.[0-9]+)*$").unwrap());
static BARE_INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
static SPLIT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(?:\.[0-9]+)*\.?$").unwrap());

/// Text emitted in place of a heading whose section is suppressed.
pub fn ignored_placeholder(number: &str, title: &str) -> String {
    let label = [number.trim(), title.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    format!("[IGNORED SECTION: {label}]")
}

/// What one line turned into.
enum LineOutcome {
    Emit(String),
    Blank,
    Drop,
}

pub struct PageAnnotator<'a> {
    detector: HeadingDetector<'a>,
    config: AnnotatorConfig,
}

impl<'a> PageAnnotator<'a> {
    pub fn new(detector: HeadingDetector<'a>, config: AnnotatorConfig) -> Self {
        Self { detector, config }
    }

    pub fn detector(&self) -> &HeadingDetector<'a> {
        &self.detector
    }

    /// Annotate one cleaned page, feeding the aggregator as headings and body
    /// lines are recognised. Returns the annotated page text, empty for pages
    /// judged to be a table of contents.
    pub fn annotate(
        &self,
        cleaned_text: &str,
        page_number: u32,
        aggregator: &mut SectionAggregator,
    ) -> String {
        if cleaned_text.is_empty() {
            return String::new();
        }
        let lines: Vec<&str> = cleaned_text.lines().collect();
        if self.looks_like_toc(&lines, page_number) {
            debug!(target: ANNOTATE, page = page_number, "Dropping table-of-contents page");
            return String::new();
        }

        let mut output: Vec<String> = Vec::with_capacity(lines.len());
        let mut consumed: HashSet<usize> = HashSet::new();
        for (idx, raw_line) in lines.iter().enumerate() {
            if consumed.contains(&idx) {
                continue;
            }
            let stripped = raw_line.trim();
            let outcome = if stripped.is_empty() {
                LineOutcome::Blank
            } else {
                match self.annotate_line(&lines, idx, page_number, aggregator, &mut consumed) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(
                            target: ANNOTATE,
                            page = page_number,
                            line = stripped,
                            error = %e,
                            "Line could not be evaluated, keeping it as text"
                        );
                        if aggregator.is_ignoring() {
                            LineOutcome::Drop
                        } else {
                            aggregator.add_text(stripped, page_number);
                            LineOutcome::Emit(stripped.to_string())
                        }
                    }
                }
            };
            match outcome {
                LineOutcome::Emit(text) => output.push(text),
                LineOutcome::Blank if !aggregator.is_ignoring() => output.push(String::new()),
                LineOutcome::Blank | LineOutcome::Drop => {}
            }
        }

        if aggregator.is_ignoring() {
            output.retain(|line| !line.is_empty());
        }
        output.join("\n")
    }

    /// Handle one non-blank line. Errors leave the aggregator untouched so the
    /// caller can fall back to plain text.
    fn annotate_line(
        &self,
        lines: &[&str],
        idx: usize,
        page_number: u32,
        aggregator: &mut SectionAggregator,
        consumed: &mut HashSet<usize>,
    ) -> Result<LineOutcome> {
        let stripped = lines[idx].trim();
        let mut heading = self.detector.detect(stripped, page_number)?;

        if heading.is_none() && SPLIT_NUMBER_RE.is_match(stripped) {
            if let Some((found, used)) = self.join_split_heading(lines, idx, page_number)? {
                consumed.insert(used);
                heading = Some(found);
            }
        }

        let Some(heading) = heading else {
            if aggregator.is_ignoring() {
                return Ok(LineOutcome::Drop);
            }
            aggregator.add_text(stripped, page_number);
            return Ok(LineOutcome::Emit(stripped.to_string()));
        };

        if self.detector.labels().matches_heading(&heading.number, &heading.title) {
            debug!(
                target: ANNOTATE,
                page = page_number,
                number = %heading.number,
                title = %heading.title,
                "Suppressing section"
            );
            aggregator.begin_ignored_section(heading.level);
            return Ok(LineOutcome::Emit(ignored_placeholder(&heading.number, &heading.title)));
        }

        aggregator.end_ignored_section();
        if aggregator.start_section(heading.level, &heading.number, &heading.title, page_number) {
            Ok(LineOutcome::Emit(format_heading(&heading.number, &heading.title)))
        } else {
            aggregator.add_text(stripped, page_number);
            Ok(LineOutcome::Emit(stripped.to_string()))
        }
    }

    /// A chapter number alone on its line: try it together with each of the
    /// next few non-blank lines. Returns the heading and the index of the line
    /// that supplied the title.
    fn join_split_heading(
        &self,
        lines: &[&str],
        idx: usize,
        page_number: u32,
    ) -> Result<Option<(Heading, usize)>> {
        let number = lines[idx].trim();
        let window = self.config.lookahead.min(lines.len().saturating_sub(idx + 1));
        for offset in 1..=window {
            let candidate = lines[idx + offset].trim();
            if candidate.is_empty() {
                continue;
            }
            let combined = format!("{number} {candidate}");
            if let Some(heading) = self.detector.detect(&combined, page_number)? {
                debug!(
                    target: ANNOTATE,
                    page = page_number,
                    combined = %combined,
                    "Joined split heading"
                );
                return Ok(Some((heading, idx + offset)));
            }
        }
        Ok(None)
    }

    /// Early pages dominated by bare section numbers or page references are a
    /// table of contents.
    fn looks_like_toc(&self, lines: &[&str], page_number: u32) -> bool {
        if page_number > self.config.toc_scan_pages {
            return false;
        }
        let non_empty: Vec<&str> = lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();
        if non_empty.len() <= self.config.toc_min_lines {
            return false;
        }
        let bare_numbers = non_empty
            .iter()
            .filter(|line| BARE_SECTION_NUMBER_RE.is_match(line))
            .count();
        let page_references = non_empty
            .iter()
            .filter(|line| BARE_INTEGER_RE.is_match(line))
            .filter(|line| {
                line.parse::<u64>()
                    .map_or(true, |value| value > self.config.toc_page_ref_min)
            })
            .count();

        bare_numbers as f64 / non_empty.len() as f64 > self.config.toc_number_ratio
            || page_references > self.config.toc_page_ref_count
    }
}
