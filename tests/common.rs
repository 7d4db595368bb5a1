#![allow(dead_code)]

use sectioner_pdf::annotate::PageAnnotator;
use sectioner_pdf::config::{AnnotatorConfig, DetectorConfig, ExtractorConfig, HeadingDialect};
use sectioner_pdf::heading::HeadingDetector;
use sectioner_pdf::labels::IgnoreLabels;
use sectioner_pdf::parse::TextPageSource;
use sectioner_pdf::pipeline::{DocumentProcessor, ProcessedDocument};
use sectioner_pdf::SectionAggregator;

pub fn labels() -> IgnoreLabels {
    IgnoreLabels::with_defaults()
}

pub fn detector(labels: &IgnoreLabels) -> HeadingDetector<'_> {
    HeadingDetector::new(DetectorConfig::default(), labels)
}

pub fn loose_detector(labels: &IgnoreLabels) -> HeadingDetector<'_> {
    let config = DetectorConfig {
        dialect: HeadingDialect::Loose,
        ..DetectorConfig::default()
    };
    HeadingDetector::new(config, labels)
}

pub fn annotator(labels: &IgnoreLabels) -> PageAnnotator<'_> {
    PageAnnotator::new(detector(labels), AnnotatorConfig::default())
}

/// Annotate consecutive pages (numbered from `first_page`) with one aggregator.
pub fn annotate_pages(
    labels: &IgnoreLabels,
    pages: &[&str],
    first_page: u32,
) -> (Vec<String>, SectionAggregator) {
    let annotator = annotator(labels);
    let mut aggregator = SectionAggregator::new();
    let annotated = pages
        .iter()
        .zip(first_page..)
        .map(|(text, page)| annotator.annotate(text, page, &mut aggregator))
        .collect();
    (annotated, aggregator)
}

/// Full pipeline over in-memory pages; returns the annotated stream.
pub fn run_pages(
    config: &ExtractorConfig,
    labels: &IgnoreLabels,
    pages: &[&str],
) -> (String, ProcessedDocument) {
    let source = TextPageSource::new(
        "sample.pdf",
        pages.iter().map(|page| page.to_string()).collect(),
    );
    let mut out = Vec::new();
    let document = DocumentProcessor::new(config, labels)
        .process(&source, &mut out)
        .expect("in-memory processing succeeds");
    (String::from_utf8(out).expect("utf-8 output"), document)
}

/// Filler that pushes a page past the OCR threshold without looking like a
/// heading.
pub fn body(sentence: &str) -> String {
    format!("{sentence} This sentence is here to make the page long enough.")
}
