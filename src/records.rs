//! Structured section output: one JSON object per line.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregator::SectionBlock;
use crate::error::Result;

/// Most records visited per chain, which also stops on cyclic parent links.
pub const MAX_CATEGORY_DEPTH: usize = 10;

/// Every key is always written; absent values are `null`, never omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub pdf: String,
    pub section_number: Option<String>,
    pub title: String,
    pub level: usize,
    pub parent_number: Option<String>,
    pub page_start: u32,
    pub page_end: u32,
    pub heading: String,
    pub text: String,
}

impl SectionRecord {
    pub fn from_block(pdf: &str, block: &SectionBlock) -> Self {
        SectionRecord {
            pdf: pdf.to_string(),
            section_number: Some(block.number.clone()).filter(|number| !number.is_empty()),
            title: block.title.clone(),
            level: block.level,
            parent_number: block.parent_number.clone(),
            page_start: block.page_start,
            page_end: block.page_end,
            heading: block.heading_text(),
            text: block.text(),
        }
    }

    /// `number title`, or just the title for unnumbered sections.
    pub fn category_label(&self) -> Option<String> {
        match &self.section_number {
            Some(number) => Some(format!("{number} {}", self.title)),
            None if !self.title.is_empty() => Some(self.title.clone()),
            None => None,
        }
    }
}

/// `<stem>_sections.jsonl` next to the flat text output.
pub fn sections_path(text_output: &Path) -> PathBuf {
    let stem = text_output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    text_output.with_file_name(format!("{stem}_sections.jsonl"))
}

pub fn write_jsonl<W: Write>(writer: W, records: &[SectionRecord]) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_jsonl_file(path: &Path, records: &[SectionRecord]) -> Result<()> {
    write_jsonl(File::create(path)?, records)
}

/// Blank lines are skipped; anything else must be a complete record.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<SectionRecord>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

pub fn read_jsonl_file(path: &Path) -> Result<Vec<SectionRecord>> {
    read_jsonl(BufReader::new(File::open(path)?))
}

/// Records of one document indexed by section number.
pub fn index_by_number(records: &[SectionRecord]) -> HashMap<&str, &SectionRecord> {
    records
        .iter()
        .filter_map(|record| record.section_number.as_deref().map(|number| (number, record)))
        .collect()
}

/// Category labels from the record itself up through its ancestors, innermost
/// first: `["8.6.2 Real-time", "8.6 Timing", "8 Process"]`.
pub fn category_chain(
    record: &SectionRecord,
    index: &HashMap<&str, &SectionRecord>,
) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = Some(record);
    for _ in 0..MAX_CATEGORY_DEPTH {
        let Some(section) = current else {
            break;
        };
        chain.extend(section.category_label());
        current = section
            .parent_number
            .as_deref()
            .and_then(|number| index.get(number).copied());
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_path_uses_stem() {
        assert_eq!(
            sections_path(Path::new("/out/manual.txt")),
            PathBuf::from("/out/manual_sections.jsonl")
        );
    }

    #[test]
    fn empty_number_serializes_as_null() {
        let block = SectionBlock {
            level: 1,
            number: String::new(),
            title: "GLOSSARY".to_string(),
            page_start: 3,
            page_end: 4,
            parent_number: None,
            lines: vec!["GLOSSARY".to_string(), "term".to_string()],
            closed: true,
        };
        let record = SectionRecord::from_block("a.pdf", &block);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["section_number"].is_null());
        assert!(json["parent_number"].is_null());
        assert_eq!(json["text"], "GLOSSARY\nterm");
        assert_eq!(json["heading"], "GLOSSARY");
    }
}
