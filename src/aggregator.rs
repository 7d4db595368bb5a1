//! Section aggregation state machine.
//!
//! Accepted headings open [`SectionBlock`]s on a stack whose levels strictly
//! increase from bottom to top; body lines go to the innermost open block.
//! Numbered headings must advance the numbering established so far, which
//! filters out body lines that only happen to look like headings.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::logging::AGGREGATE;

const ROOT_LEVEL: usize = 0;
const ROOT_NUMBER: &str = "0";
const ROOT_TITLE: &str = "Document";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBlock {
    pub level: usize,
    pub number: String,
    pub title: String,
    pub page_start: u32,
    pub page_end: u32,
    pub parent_number: Option<String>,
    pub lines: Vec<String>,
    pub closed: bool,
}

impl SectionBlock {
    fn new(
        level: usize,
        number: &str,
        title: &str,
        page: u32,
        parent_number: Option<String>,
    ) -> Self {
        SectionBlock {
            level,
            number: number.to_string(),
            title: title.to_string(),
            page_start: page,
            page_end: page,
            parent_number,
            lines: Vec::new(),
            closed: false,
        }
    }

    /// `number title`, leaving out whichever part is empty.
    pub fn heading_text(&self) -> String {
        [self.number.trim(), self.title.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Body lines joined with newlines, surrounding whitespace trimmed.
    pub fn text(&self) -> String {
        self.lines.join("\n").trim().to_string()
    }

    pub fn is_root(&self) -> bool {
        self.level == ROOT_LEVEL && self.number == ROOT_NUMBER
    }

    fn extend_to(&mut self, page: u32) {
        self.page_end = self.page_end.max(page);
    }
}

/// Accumulates the sections of one document. Pages must be fed in order.
#[derive(Debug, Default)]
pub struct SectionAggregator {
    /// Every block ever opened, in opening order.
    blocks: Vec<SectionBlock>,
    /// Indices into `blocks` of the open blocks, outermost first.
    active: Vec<usize>,
    ignoring: bool,
    ignore_level: Option<usize>,
    /// Numeric parts of the last accepted numbered heading.
    last_parts: Vec<u64>,
}

impl SectionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to open a section. Returns `false` when the number is malformed or
    /// does not advance the sequence; state is untouched in that case.
    pub fn start_section(&mut self, level: usize, number: &str, title: &str, page: u32) -> bool {
        let number = number.trim();
        let title = title.trim();

        if number.is_empty() || number == ROOT_NUMBER {
            self.open_block(level, number, title, page);
            return true;
        }

        let Some(parts) = parse_section_number(number) else {
            debug!(target: AGGREGATE, number, "Rejected: malformed section number");
            return false;
        };
        if !advances(&self.last_parts, &parts) {
            debug!(
                target: AGGREGATE,
                number,
                previous = %format_parts(&self.last_parts),
                page,
                "Rejected: numbering does not advance"
            );
            return false;
        }
        self.last_parts = parts;
        self.open_block(level, number, title, page);
        true
    }

    /// Close everything at `level` or deeper and drop text until
    /// [`end_ignored_section`](Self::end_ignored_section).
    pub fn begin_ignored_section(&mut self, level: usize) {
        self.close_until(level);
        self.ignoring = true;
        self.ignore_level = Some(level);
        debug!(target: AGGREGATE, level, "Entering ignored section");
    }

    pub fn end_ignored_section(&mut self) {
        if self.ignoring {
            debug!(target: AGGREGATE, level = ?self.ignore_level, "Leaving ignored section");
        }
        self.ignoring = false;
        self.ignore_level = None;
    }

    /// Attach a body line to the innermost open block, opening the implicit
    /// document root if nothing is open yet.
    pub fn add_text(&mut self, line: &str, page: u32) {
        if self.ignoring || line.trim().is_empty() {
            return;
        }
        if self.active.is_empty() {
            self.open_block(ROOT_LEVEL, ROOT_NUMBER, ROOT_TITLE, page);
        }
        self.extend_open_blocks(page);
        if let Some(&innermost) = self.active.last() {
            self.blocks[innermost].lines.push(line.to_string());
        }
    }

    /// Close all open blocks and return the closed ones ordered by
    /// `(page_start, level)`. The synthetic root is only returned when it is
    /// the sole block. Calling this again yields the same result.
    pub fn finalize(&mut self) -> Vec<SectionBlock> {
        self.end_ignored_section();
        self.close_until(ROOT_LEVEL);

        let closed: Vec<&SectionBlock> = self.blocks.iter().filter(|block| block.closed).collect();
        let (roots, mut sections): (Vec<&SectionBlock>, Vec<&SectionBlock>) =
            closed.into_iter().partition(|block| block.is_root());
        if sections.is_empty() {
            sections = roots;
        }
        let mut sections: Vec<SectionBlock> = sections.into_iter().cloned().collect();
        sections.sort_by_key(|block| (block.page_start, block.level));
        debug!(target: AGGREGATE, sections = sections.len(), "Finalized sections");
        sections
    }

    pub fn is_ignoring(&self) -> bool {
        self.ignoring
    }

    pub fn ignore_level(&self) -> Option<usize> {
        self.ignore_level
    }

    /// Levels of the open blocks, outermost first.
    pub fn active_levels(&self) -> Vec<usize> {
        self.active.iter().map(|&idx| self.blocks[idx].level).collect()
    }

    fn open_block(&mut self, level: usize, number: &str, title: &str, page: u32) {
        self.close_until(level);
        let parent = self.find_parent(level);
        let mut block = SectionBlock::new(level, number, title, page, parent);
        if !block.is_root() {
            let heading = block.heading_text();
            if !heading.is_empty() {
                block.lines.push(heading);
            }
        }
        trace!(
            target: AGGREGATE,
            level,
            number,
            title,
            page,
            parent = ?block.parent_number,
            "Opened section"
        );
        self.blocks.push(block);
        self.active.push(self.blocks.len() - 1);
        self.extend_open_blocks(page);
    }

    fn close_until(&mut self, level: usize) {
        while let Some(&top) = self.active.last() {
            if self.blocks[top].level < level {
                break;
            }
            self.active.pop();
            self.blocks[top].closed = true;
        }
    }

    fn find_parent(&self, level: usize) -> Option<String> {
        self.active
            .iter()
            .rev()
            .map(|&idx| &self.blocks[idx])
            .find(|block| {
                block.level < level && !block.number.is_empty() && block.number != ROOT_NUMBER
            })
            .map(|block| block.number.clone())
    }

    fn extend_open_blocks(&mut self, page: u32) {
        for &idx in &self.active {
            self.blocks[idx].extend_to(page);
        }
    }
}

fn parse_section_number(number: &str) -> Option<Vec<u64>> {
    number.split('.').map(|part| part.parse().ok()).collect()
}

fn format_parts(parts: &[u64]) -> String {
    parts.iter().map(u64::to_string).collect::<Vec<_>>().join(".")
}

/// Whether `next` may follow `last`: the first differing shared component
/// must grow, or with an identical shared prefix `next` must be deeper.
fn advances(last: &[u64], next: &[u64]) -> bool {
    if last.is_empty() {
        return true;
    }
    for (previous, current) in last.iter().zip(next) {
        match current.cmp(previous) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
    next.len() > last.len()
}
