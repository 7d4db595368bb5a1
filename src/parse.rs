//! Page sources: where raw per-page text comes from.
//!
//! PDFs are read with lopdf; pre-extracted text dumps use form feeds as page
//! separators. Scanned pages can be recovered through an [`OcrEngine`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use crate::config::OcrConfig;
use crate::error::{Error, Result};
use crate::logging::PIPELINE;

const PAGE_SEPARATOR: char = '\x0c';

/// A document whose pages can be read one at a time, 1-based.
pub trait PageSource {
    fn name(&self) -> &str;
    fn page_count(&self) -> u32;
    fn page_text(&self, page: u32) -> Result<String>;

    /// Text recognised from the rendered page, if this source can do that.
    fn ocr_page(&self, _page: u32) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Renders a PDF page and recognises its text.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, pdf: &Path, page: u32) -> Result<String>;
}

/// Image streams carry no text; skipping them keeps large scans cheap to load.
fn skip_images(object_id: ObjectId, object: &mut Object) -> Option<(ObjectId, Object)> {
    if let Ok(stream) = object.as_stream() {
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|name| name == b"Image");
        if is_image {
            return None;
        }
    }
    Some((object_id, object.to_owned()))
}

pub fn load_pdf<P: AsRef<Path>>(path: P) -> Result<Document> {
    Ok(Document::load_filtered(path, skip_images)?)
}

pub struct PdfPageSource {
    name: String,
    path: PathBuf,
    document: Document,
    page_count: u32,
    ocr: Option<Box<dyn OcrEngine>>,
}

impl fmt::Debug for PdfPageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfPageSource")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("page_count", &self.page_count)
            .field("ocr", &self.ocr.is_some())
            .finish()
    }
}

impl PdfPageSource {
    pub fn open(path: &Path) -> Result<Self> {
        let document = load_pdf(path)?;
        let page_count = document.get_pages().len() as u32;
        debug!(target: PIPELINE, path = %path.display(), pages = page_count, "Loaded PDF");
        Ok(PdfPageSource {
            name: file_name(path),
            path: path.to_path_buf(),
            document,
            page_count,
            ocr: None,
        })
    }

    pub fn with_ocr(mut self, engine: Box<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSource for PdfPageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let text = self.document.extract_text(&[page])?;
        trace!(target: PIPELINE, page, chars = text.len(), "Extracted page text");
        Ok(text)
    }

    fn ocr_page(&self, page: u32) -> Result<Option<String>> {
        match &self.ocr {
            Some(engine) => engine.recognize(&self.path, page).map(Some),
            None => Ok(None),
        }
    }
}

/// Pre-extracted text, pages separated by form feeds (as `pdftotext` writes).
#[derive(Debug, Clone)]
pub struct TextPageSource {
    name: String,
    pages: Vec<String>,
}

impl TextPageSource {
    pub fn new(name: impl Into<String>, pages: Vec<String>) -> Self {
        TextPageSource {
            name: name.into(),
            pages,
        }
    }

    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        let mut pages: Vec<String> = text.split(PAGE_SEPARATOR).map(str::to_string).collect();
        // A dump usually ends with a separator; that is not an extra page.
        if pages.len() > 1 && pages.last().is_some_and(|page| page.trim().is_empty()) {
            pages.pop();
        }
        Self::new(name, pages)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_text(file_name(path), &text))
    }
}

impl PageSource for TextPageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let idx = page.checked_sub(1).map(|idx| idx as usize);
        Ok(idx
            .and_then(|idx| self.pages.get(idx))
            .cloned()
            .unwrap_or_default())
    }
}

/// `pdftoppm` renders the page to PNG in a temporary directory, `tesseract`
/// reads it back as text.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    lang: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        TesseractOcr {
            lang: config.lang.clone(),
            dpi: config.dpi,
        }
    }

    /// Whether both external tools can be started.
    pub fn is_available() -> bool {
        let pdftoppm = Command::new("pdftoppm").arg("-v").output().is_ok();
        let tesseract = Command::new("tesseract").arg("--version").output().is_ok();
        pdftoppm && tesseract
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, pdf: &Path, page: u32) -> Result<String> {
        let workdir = tempfile::tempdir()?;
        let prefix = workdir.path().join("page");
        let page_arg = page.to_string();

        let rendered = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .args(["-r", &self.dpi.to_string()])
            .args(["-f", &page_arg, "-l", &page_arg])
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| Error::Ocr {
                page,
                reason: format!("failed to run pdftoppm: {e}"),
            })?;
        if !rendered.status.success() {
            return Err(Error::Ocr {
                page,
                reason: format!("pdftoppm: {}", String::from_utf8_lossy(&rendered.stderr).trim()),
            });
        }

        let image = prefix.with_extension("png");
        let recognised = Command::new("tesseract")
            .arg(&image)
            .arg("stdout")
            .args(["-l", &self.lang])
            .output()
            .map_err(|e| Error::Ocr {
                page,
                reason: format!("failed to run tesseract: {e}"),
            })?;
        if !recognised.status.success() {
            return Err(Error::Ocr {
                page,
                reason: format!("tesseract: {}", String::from_utf8_lossy(&recognised.stderr).trim()),
            });
        }
        Ok(String::from_utf8_lossy(&recognised.stdout).into_owned())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
