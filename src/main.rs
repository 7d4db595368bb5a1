use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use sectioner_pdf::config::ExtractorConfig;
use sectioner_pdf::labels::IgnoreLabels;
use sectioner_pdf::logging::PIPELINE;
use sectioner_pdf::parse::TesseractOcr;
use sectioner_pdf::pipeline::DocumentProcessor;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Convert PDFs to text with heading markers and optional section records.",
    arg_required_else_help = true
)]
pub struct Args {
    /// A PDF, a directory of PDFs, or a text dump with form-feed page breaks
    pub input: PathBuf,

    /// Directory for `<name>.txt` (and `<name>_sections.jsonl`)
    pub output_dir: PathBuf,

    /// Tesseract language for OCR of scanned pages
    #[clap(long)]
    pub lang: Option<String>,

    /// Also write one JSON record per detected section
    #[clap(long)]
    pub json_structure: bool,

    /// JSON file with additional section labels to ignore
    #[clap(long)]
    pub ignore_config: Option<PathBuf>,

    /// JSON file overriding the extraction settings
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Write the decision log to this directory instead of stderr
    #[clap(long)]
    pub log_dir: Option<PathBuf>,

    /// Log every heading and aggregation decision
    #[clap(long)]
    pub debug: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn main() -> Result<()> {
    let args = Args::parse_args();

    let _guard = match &args.log_dir {
        Some(dir) => sectioner_pdf::logging::init_logging_with_dir(args.debug, &expand(dir))
            .context("failed to set up the log directory")?,
        None => sectioner_pdf::logging::init_logging(args.debug),
    };

    let mut config = match &args.config {
        Some(path) => ExtractorConfig::from_file(&expand(path))
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExtractorConfig::default(),
    };
    if let Some(lang) = args.lang {
        config.ocr.lang = lang;
    }

    let ignore_config = args.ignore_config.as_deref().map(expand);
    let labels = IgnoreLabels::load(ignore_config.as_deref());

    let ocr = TesseractOcr::is_available();
    if !ocr {
        warn!(target: PIPELINE, "pdftoppm or tesseract not found, scanned pages stay empty");
    }
    let processor = DocumentProcessor::new(&config, &labels)
        .with_ocr(ocr)
        .with_structure(args.json_structure);

    let input = expand(&args.input);
    let output_dir = expand(&args.output_dir);

    if input.is_dir() {
        let summary = processor
            .process_directory(&input, &output_dir)
            .with_context(|| format!("failed to process {}", input.display()))?;
        info!(target: PIPELINE, processed = summary.processed, failed = summary.failed, "Done");
        if summary.failed > 0 {
            bail!(
                "{} of {} documents failed",
                summary.failed,
                summary.processed + summary.failed
            );
        }
        return Ok(());
    }

    let is_text = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    let document = if is_text {
        processor.process_text_file(&input, &output_dir)
    } else {
        processor.process_pdf_file(&input, &output_dir)
    }
    .with_context(|| format!("failed to process {}", input.display()))?;

    info!(
        target: PIPELINE,
        pages = document.pages,
        sections = document.sections.len(),
        "Done"
    );
    Ok(())
}
