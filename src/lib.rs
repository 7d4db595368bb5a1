//! Recovers the section structure of technical PDF documents from their
//! extracted text: cleaned, furniture-free page text annotated with
//! `###{number}[title]` heading markers, plus one record per section.

pub mod aggregator;
pub mod annotate;
pub mod chunker;
pub mod clean;
pub mod config;
pub mod error;
pub mod furniture;
pub mod heading;
pub mod labels;
pub mod logging;
pub mod parse;
pub mod pipeline;
pub mod records;

pub use aggregator::{SectionAggregator, SectionBlock};
pub use annotate::PageAnnotator;
pub use config::{ExtractorConfig, HeadingDialect};
pub use error::{Error, Result};
pub use heading::{format_heading, parse_heading_marker, Heading, HeadingDetector, HeadingKind};
pub use labels::{normalize_label, IgnoreLabels};
pub use pipeline::{DocumentProcessor, ProcessedDocument};
