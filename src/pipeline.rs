//! Document driver: page source in, annotated text and section records out.
//!
//! One document is processed strictly page by page; the furniture profile and
//! the section numbering both depend on what earlier pages established.
//! Separate documents share nothing but the read-only configuration and
//! ignore labels, so a directory is processed in parallel.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, error, info, info_span, warn};

use crate::aggregator::{SectionAggregator, SectionBlock};
use crate::annotate::PageAnnotator;
use crate::clean::clean_text;
use crate::config::ExtractorConfig;
use crate::error::Result;
use crate::furniture::PagePreprocessor;
use crate::heading::HeadingDetector;
use crate::labels::IgnoreLabels;
use crate::logging::PIPELINE;
use crate::parse::{PageSource, PdfPageSource, TesseractOcr, TextPageSource};
use crate::records::{sections_path, write_jsonl_file, SectionRecord};

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub name: String,
    pub pages: u32,
    pub sections: Vec<SectionBlock>,
}

impl ProcessedDocument {
    pub fn records(&self) -> Vec<SectionRecord> {
        self.sections
            .iter()
            .map(|block| SectionRecord::from_block(&self.name, block))
            .collect()
    }
}

/// Outcome of a directory run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentProcessor<'a> {
    config: &'a ExtractorConfig,
    labels: &'a IgnoreLabels,
    ocr: bool,
    write_structure: bool,
}

impl<'a> DocumentProcessor<'a> {
    pub fn new(config: &'a ExtractorConfig, labels: &'a IgnoreLabels) -> Self {
        Self {
            config,
            labels,
            ocr: false,
            write_structure: false,
        }
    }

    /// Recognise near-empty PDF pages with tesseract.
    pub fn with_ocr(mut self, enabled: bool) -> Self {
        self.ocr = enabled;
        self
    }

    /// Also write `<stem>_sections.jsonl` next to each text output.
    pub fn with_structure(mut self, enabled: bool) -> Self {
        self.write_structure = enabled;
        self
    }

    /// Run every page of `source` through cleaning, furniture removal and
    /// annotation, writing the annotated stream to `out`.
    pub fn process<S, W>(&self, source: &S, out: &mut W) -> Result<ProcessedDocument>
    where
        S: PageSource + ?Sized,
        W: Write,
    {
        let _span = info_span!(target: PIPELINE, "document", name = source.name()).entered();
        let mut preprocessor = PagePreprocessor::new(self.config.furniture.clone())?;
        let detector = HeadingDetector::new(self.config.detector.clone(), self.labels);
        let annotator = PageAnnotator::new(detector, self.config.annotator.clone());
        let mut aggregator = SectionAggregator::new();

        let total = source.page_count();
        for page in 1..=total {
            let annotated =
                self.process_page(source, page, &mut preprocessor, &annotator, &mut aggregator);
            writeln!(out, "{}", self.config.page_delimiter(page))?;
            if annotated.is_empty() {
                writeln!(out)?;
            } else {
                write!(out, "{annotated}\n\n")?;
            }
            info!(target: PIPELINE, page, total, "Processed page");
        }
        out.flush()?;

        let sections = aggregator.finalize();
        info!(target: PIPELINE, pages = total, sections = sections.len(), "Processed document");
        Ok(ProcessedDocument {
            name: source.name().to_string(),
            pages: total,
            sections,
        })
    }

    fn process_page<S: PageSource + ?Sized>(
        &self,
        source: &S,
        page: u32,
        preprocessor: &mut PagePreprocessor,
        annotator: &PageAnnotator<'_>,
        aggregator: &mut SectionAggregator,
    ) -> String {
        let mut raw = source.page_text(page).unwrap_or_else(|e| {
            warn!(
                target: PIPELINE,
                page,
                error = %e,
                "Text extraction failed, treating page as empty"
            );
            String::new()
        });
        let mut skip = self.should_skip(&raw);

        if !skip && raw.trim().chars().count() < self.config.ocr.min_text_chars {
            match source.ocr_page(page) {
                Ok(Some(recognised)) => {
                    debug!(target: PIPELINE, page, chars = recognised.len(), "Using OCR text");
                    raw = recognised;
                    skip = self.should_skip(&raw);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(target: PIPELINE, page, error = %e, "OCR failed, keeping extracted text");
                }
            }
        }

        let cleaned = clean_text(&raw);
        // Skipped pages still teach the furniture profile.
        let filtered = preprocessor.clean_page(&cleaned, page);
        if skip {
            debug!(target: PIPELINE, page, "Skipping page that opens with an ignored section");
            return String::new();
        }
        annotator.annotate(&filtered, page, aggregator)
    }

    fn should_skip(&self, raw: &str) -> bool {
        self.config.skip_label_pages && self.labels.should_skip_page(raw)
    }

    /// Process `source` into `<output_dir>/<stem>.txt`, plus the section file
    /// when structure output is enabled and any section was found.
    pub fn process_to_dir<S: PageSource + ?Sized>(
        &self,
        source: &S,
        stem: &str,
        output_dir: &Path,
    ) -> Result<ProcessedDocument> {
        fs::create_dir_all(output_dir)?;
        let text_path = output_dir.join(format!("{stem}.txt"));
        let mut writer = BufWriter::new(File::create(&text_path)?);
        let document = self.process(source, &mut writer)?;

        if self.write_structure && !document.sections.is_empty() {
            let records_path = sections_path(&text_path);
            write_jsonl_file(&records_path, &document.records())?;
            debug!(target: PIPELINE, path = %records_path.display(), "Wrote section records");
        }
        Ok(document)
    }

    pub fn process_pdf_file(&self, path: &Path, output_dir: &Path) -> Result<ProcessedDocument> {
        let mut source = PdfPageSource::open(path)?;
        if self.ocr {
            source = source.with_ocr(Box::new(TesseractOcr::new(&self.config.ocr)));
        }
        self.process_to_dir(&source, &file_stem(path), output_dir)
    }

    pub fn process_text_file(&self, path: &Path, output_dir: &Path) -> Result<ProcessedDocument> {
        let source = TextPageSource::open(path)?;
        self.process_to_dir(&source, &file_stem(path), output_dir)
    }

    /// Every `*.pdf` directly inside `input_dir`, in parallel. A failing
    /// document is logged and counted; the others still run.
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchSummary> {
        let pdfs = list_pdfs(input_dir)?;
        info!(
            target: PIPELINE,
            dir = %input_dir.display(),
            documents = pdfs.len(),
            "Processing directory"
        );

        let failures = pdfs
            .par_iter()
            .map(|path| match self.process_pdf_file(path, output_dir) {
                Ok(_) => 0,
                Err(e) => {
                    error!(
                        target: PIPELINE,
                        path = %path.display(),
                        error = %e,
                        "Failed to process document"
                    );
                    1
                }
            })
            .sum::<usize>();

        Ok(BatchSummary {
            processed: pdfs.len() - failures,
            failed: failures,
        })
    }
}

/// `*.pdf` files (any case) directly inside `dir`, sorted. Files whose stems
/// differ only in case would write the same outputs; the first one wins.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    let mut stems = HashSet::new();
    let mut pdfs = Vec::with_capacity(candidates.len());
    for path in candidates {
        if stems.insert(file_stem(&path).to_lowercase()) {
            pdfs.push(path);
        } else {
            warn!(
                target: PIPELINE,
                path = %path.display(),
                "Skipping document whose output name is already taken"
            );
        }
    }
    Ok(pdfs)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
