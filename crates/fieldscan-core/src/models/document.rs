//! Raw document input produced by the text-acquisition collaborator.

use serde::{Deserialize, Serialize};

/// Page separator used when a document arrives as a single string.
pub const PAGE_BREAK: char = '\u{000c}';

/// One line of decoded document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    /// Page number (1-indexed).
    pub page: u32,
    /// Line text without the trailing newline.
    pub text: String,
}

/// An ordered sequence of `(page, line)` pairs.
///
/// Immutable once built; every extraction pass reads it, none writes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    lines: Vec<DocumentLine>,
}

impl RawDocument {
    /// Create a document from explicit `(page, text)` pairs.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            lines: lines
                .into_iter()
                .map(|(page, text)| DocumentLine {
                    page,
                    text: text.into(),
                })
                .collect(),
        }
    }

    /// Create a document from per-page text blocks. Pages are numbered from 1.
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines = Vec::new();
        for (idx, page) in pages.into_iter().enumerate() {
            let number = idx as u32 + 1;
            for line in page.as_ref().lines() {
                lines.push(DocumentLine {
                    page: number,
                    text: line.trim_end_matches('\r').to_string(),
                });
            }
        }
        Self { lines }
    }

    /// Create a document from a single string, splitting pages on form feeds.
    pub fn from_text(text: &str) -> Self {
        Self::from_pages(text.split(PAGE_BREAK))
    }

    /// All lines in reading order.
    pub fn lines(&self) -> &[DocumentLine] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the document has no lines at all.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the document has no line with visible text.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.text.trim().is_empty())
    }

    /// Number of the last page, or 0 for an empty document.
    pub fn page_count(&self) -> u32 {
        self.lines.iter().map(|l| l.page).max().unwrap_or(0)
    }
}
