//! Read-only per-document index shared by every pass.

use crate::models::{DocumentLine, PAGE_BREAK, RawDocument};
use crate::rules::patterns::collapse_whitespace;

use super::layout::{TableRegion, detect_regions};

/// Characters kept on each side of a value in its context snippet.
pub const CONTEXT_RADIUS: usize = 100;
/// Longest context snippet, in characters, before the ellipsis.
pub const CONTEXT_MAX_LEN: usize = 200;

/// Joined text, line offsets and table layout of one document.
#[derive(Debug)]
pub struct DocumentView<'a> {
    lines: &'a [DocumentLine],
    text: String,
    offsets: Vec<usize>,
    tables: Vec<TableRegion>,
}

impl<'a> DocumentView<'a> {
    /// Index a document.
    ///
    /// Lines are joined with `\n`. A line holding a single form feed is
    /// inserted between pages so no regex match spans a page boundary by
    /// accident.
    pub fn new(doc: &'a RawDocument) -> Self {
        let lines = doc.lines();
        let mut text = String::new();
        let mut offsets = Vec::with_capacity(lines.len());
        let mut prev_page = None;

        for (idx, line) in lines.iter().enumerate() {
            if idx > 0 {
                text.push('\n');
            }
            if prev_page.is_some_and(|p| p != line.page) {
                text.push(PAGE_BREAK);
                text.push('\n');
            }
            offsets.push(text.len());
            text.push_str(&line.text);
            prev_page = Some(line.page);
        }

        Self {
            lines,
            text,
            offsets,
            tables: detect_regions(lines),
        }
    }

    /// Joined document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &'a [DocumentLine] {
        self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Byte offset of a line's first character in the joined text.
    pub fn line_offset(&self, line: usize) -> usize {
        self.offsets[line]
    }

    /// Index of the line containing a byte offset of the joined text.
    pub fn line_at(&self, offset: usize) -> usize {
        match self.offsets.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    /// Page containing a byte offset of the joined text.
    pub fn page_at(&self, offset: usize) -> u32 {
        self.lines
            .get(self.line_at(offset))
            .map_or(1, |l| l.page)
    }

    /// Snippet of the joined text around `len` bytes at `offset`.
    ///
    /// Keeps [`CONTEXT_RADIUS`] characters on each side, collapses
    /// whitespace (page breaks included) and cuts the result at
    /// [`CONTEXT_MAX_LEN`] characters followed by `...`.
    pub fn context(&self, offset: usize, len: usize) -> String {
        let text = self.text.as_str();
        let offset = floor_char_boundary(text, offset.min(text.len()));
        let end = floor_char_boundary(text, (offset + len).min(text.len()));

        let start = text[..offset]
            .char_indices()
            .rev()
            .take(CONTEXT_RADIUS)
            .last()
            .map_or(offset, |(i, _)| i);
        let stop = text[end..]
            .char_indices()
            .nth(CONTEXT_RADIUS)
            .map_or(text.len(), |(i, _)| end + i);

        let snippet = collapse_whitespace(&text[start..stop]);
        if snippet.chars().count() > CONTEXT_MAX_LEN {
            let cut: String = snippet.chars().take(CONTEXT_MAX_LEN).collect();
            format!("{}...", cut)
        } else {
            snippet
        }
    }

    /// Detected table regions in line order.
    pub fn tables(&self) -> &[TableRegion] {
        &self.tables
    }

    /// Region containing a line, if any.
    pub fn table_at(&self, line: usize) -> Option<&TableRegion> {
        self.tables.iter().find(|t| t.contains_line(line))
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
