use serde::{Deserialize, Serialize};

use crate::config::ChunkingConfig;
use crate::heading::parse_heading_marker;

/// A piece of annotated text together with the section it was found under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChunk {
    pub section_number: Option<String>,
    pub section_title: Option<String>,
    pub text: String,
}

/// Split `text` into overlapping chunks of at most `chunk_size` characters,
/// cutting after a sentence end where possible and otherwise at a space.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chunk_by_characters(&chars, config.chunk_size, config.chunk_overlap)
}

fn chunk_by_characters(chars: &[char], char_limit: usize, chunk_overlap: usize) -> Vec<String> {
    let char_limit = char_limit.max(1);
    let mut chunks = Vec::new();
    let mut start_idx = 0;

    while start_idx < chars.len() {
        let mut end_idx = (start_idx + char_limit).min(chars.len());
        if end_idx < chars.len() {
            end_idx = break_point(chars, start_idx, end_idx);
        }

        let chunk: String = chars[start_idx..end_idx].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end_idx == chars.len() {
            break;
        }
        // Step back for the overlap, but never to or before the current start.
        let overlapped = end_idx.saturating_sub(chunk_overlap);
        start_idx = if overlapped > start_idx { overlapped } else { end_idx };
    }

    chunks
}

/// Exclusive end for a chunk spanning `start..limit`: just after the last
/// sentence end, else at the last space, else `limit` itself.
fn break_point(chars: &[char], start: usize, limit: usize) -> usize {
    let sentence_end = (start + 1..limit.saturating_sub(1))
        .rev()
        .find(|&i| matches!(chars[i], '.' | '!' | '?') && matches!(chars[i + 1], ' ' | '\n'));
    if let Some(i) = sentence_end {
        return i + 1;
    }
    (start + 1..limit)
        .rev()
        .find(|&i| chars[i] == ' ')
        .unwrap_or(limit)
}

/// Chunk annotated page text section by section. Marker lines
/// (`###{number}[title]`) start a new section and are not part of any chunk;
/// text before the first marker has no section.
pub fn chunk_annotated(text: &str, config: &ChunkingConfig) -> Vec<SectionChunk> {
    let mut chunks = Vec::new();
    let mut section: (Option<String>, Option<String>) = (None, None);
    let mut body: Vec<&str> = Vec::new();

    let mut flush = |section: &(Option<String>, Option<String>), body: &mut Vec<&str>| {
        let joined = body.join("\n");
        body.clear();
        for piece in chunk_text(&joined, config) {
            chunks.push(SectionChunk {
                section_number: section.0.clone(),
                section_title: section.1.clone(),
                text: piece,
            });
        }
    };

    for line in text.lines() {
        match parse_heading_marker(line) {
            Some((number, title)) => {
                flush(&section, &mut body);
                section = (
                    Some(number).filter(|n| !n.is_empty()),
                    Some(title).filter(|t| !t.is_empty()),
                );
            }
            None => body.push(line),
        }
    }
    flush(&section, &mut body);
    chunks
}
