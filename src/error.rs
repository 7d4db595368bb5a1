use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("failed to read PDF: {source}")]
    Pdf {
        #[from]
        source: lopdf::Error,
    },

    #[error(transparent)]
    Regex {
        #[from]
        source: regex::Error,
    },

    /// A dotted section number whose components cannot be represented.
    #[error("invalid section number {number:?}")]
    InvalidSectionNumber { number: String },

    #[error("OCR failed for page {page}: {reason}")]
    Ocr { page: u32, reason: String },

    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}
