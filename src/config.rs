use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which numbered-heading grammar the detector uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingDialect {
    /// `1.2 Title` / `1. Title` where the title starts and ends with a letter
    /// and contains no colon.
    #[default]
    Strict,
    /// Any separator among whitespace, `)`, `-`, en/em dash or `:`, and any
    /// title text.
    Loose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub dialect: HeadingDialect,
    /// Numbered headings whose first component is above this are rejected.
    pub max_chapter_number: u32,
    /// A trailing number within this distance of the current page is a
    /// harmless page reference; further away it marks a TOC entry.
    pub page_reference_tolerance: u32,
    /// Tokens that mark a numbered line as a measurement rather than a title.
    pub unit_tokens: Vec<String>,
    pub detect_all_caps: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            dialect: HeadingDialect::Strict,
            max_chapter_number: 20,
            page_reference_tolerance: 1,
            unit_tokens: ["mbit/s", "mb/s", "kb/s", "bit/s", "ms", "µs", "ns"]
                .iter()
                .map(|unit| unit.to_string())
                .collect(),
            detect_all_caps: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FurnitureConfig {
    pub header_window: usize,
    pub footer_window: usize,
    pub min_repeats: usize,
    pub toc_title_tokens: Vec<String>,
    /// Pages up to this number are checked for numbered-line TOC density.
    pub toc_scan_pages: u32,
    /// Lower bound on the number of leading lines searched for TOC titles.
    pub toc_scan_min_lines: usize,
    /// Additional full-line boilerplate regexes, matched case-insensitively.
    pub extra_boilerplate_patterns: Vec<String>,
}

impl Default for FurnitureConfig {
    fn default() -> Self {
        FurnitureConfig {
            header_window: 4,
            footer_window: 4,
            min_repeats: 2,
            toc_title_tokens: vec!["table of contents".to_string(), "table des mati".to_string()],
            toc_scan_pages: 5,
            toc_scan_min_lines: 20,
            extra_boilerplate_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Pages up to this number may be discarded as a table of contents.
    pub toc_scan_pages: u32,
    /// A page needs more non-blank lines than this to be judged a TOC.
    pub toc_min_lines: usize,
    /// Share of bare section numbers above which a page is a TOC.
    pub toc_number_ratio: f64,
    /// Bare integers above this value count as page references.
    pub toc_page_ref_min: u64,
    /// More page-reference lines than this make a page a TOC.
    pub toc_page_ref_count: usize,
    /// How many following lines a bare chapter number may borrow a title from.
    pub lookahead: usize,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        AnnotatorConfig {
            toc_scan_pages: 10,
            toc_min_lines: 10,
            toc_number_ratio: 0.3,
            toc_page_ref_min: 5,
            toc_page_ref_count: 5,
            lookahead: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Extracted text shorter than this (after trimming) triggers OCR.
    pub min_text_chars: usize,
    pub lang: String,
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            min_text_chars: 30,
            lang: "deu".to_string(),
            dpi: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub detector: DetectorConfig,
    pub furniture: FurnitureConfig,
    pub annotator: AnnotatorConfig,
    pub ocr: OcrConfig,
    pub chunking: ChunkingConfig,
    /// Written before each page of annotated output; `{page}` is replaced by
    /// the 1-based page number.
    pub page_delimiter: String,
    /// Discard pages that open with an ignore-label line.
    pub skip_label_pages: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            detector: DetectorConfig::default(),
            furniture: FurnitureConfig::default(),
            annotator: AnnotatorConfig::default(),
            ocr: OcrConfig::default(),
            chunking: ChunkingConfig::default(),
            page_delimiter: "--- Seite {page} ---".to_string(),
            skip_label_pages: true,
        }
    }
}

impl ExtractorConfig {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(raw.trim_start_matches('\u{feff}')).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn page_delimiter(&self, page: u32) -> String {
        self.page_delimiter.replace("{page}", &page.to_string())
    }
}
