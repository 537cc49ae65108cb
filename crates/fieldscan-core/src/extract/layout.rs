//! Table region detection over plain text lines.
//!
//! Finds runs of rows split into columns by pipes, tabs or aligned runs of
//! spaces. Regions never span a page break.

use crate::models::DocumentLine;
use crate::rules::patterns::{COLUMN_GAP, SEPARATOR_ROW};

/// How a row is split into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnSeparator {
    Pipe,
    Tab,
    Spaces,
}

/// One cell of a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    /// Trimmed cell text.
    pub text: String,
    /// Byte offset of the trimmed text within its line.
    pub start: usize,
}

/// A row of a detected table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Line index in the document.
    pub line: usize,
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, col: usize) -> Option<&TableCell> {
        self.cells.get(col)
    }
}

/// A detected table: a header row and at least one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRegion {
    pub separator: ColumnSeparator,
    /// First row of the region.
    pub header: TableRow,
    /// Rows below the header, in line order. Ragged rows are kept.
    pub rows: Vec<TableRow>,
    /// Whether a separator row sits directly below the header.
    pub underlined: bool,
}

impl TableRegion {
    /// Number of columns defined by the header.
    pub fn num_cols(&self) -> usize {
        self.header.len()
    }

    /// Data rows whose cell count matches the header.
    pub fn aligned_rows(&self) -> impl Iterator<Item = &TableRow> {
        let cols = self.num_cols();
        self.rows.iter().filter(move |r| r.len() == cols)
    }

    /// Header and data rows in line order.
    pub fn all_rows(&self) -> impl Iterator<Item = &TableRow> {
        std::iter::once(&self.header).chain(self.rows.iter())
    }

    pub fn first_line(&self) -> usize {
        self.header.line
    }

    pub fn last_line(&self) -> usize {
        self.rows.last().map_or(self.header.line, |r| r.line)
    }

    pub fn contains_line(&self, line: usize) -> bool {
        (self.first_line()..=self.last_line()).contains(&line)
    }
}

/// Split a line into cells.
///
/// Pipes win over tabs, tabs over space runs. Returns `None` for lines with
/// fewer than two cells.
pub fn split_row(line: &str) -> Option<(ColumnSeparator, Vec<TableCell>)> {
    let (separator, cells) = if line.contains('|') {
        (ColumnSeparator::Pipe, split_on(line, pipe_spans))
    } else if line.contains('\t') {
        (ColumnSeparator::Tab, split_on(line, gap_spans))
    } else {
        (ColumnSeparator::Spaces, split_on(line, gap_spans))
    };

    if cells.len() < 2 {
        return None;
    }
    Some((separator, cells))
}

fn pipe_spans(s: &str) -> Vec<(usize, usize)> {
    s.match_indices('|').map(|(i, _)| (i, i + 1)).collect()
}

fn gap_spans(s: &str) -> Vec<(usize, usize)> {
    COLUMN_GAP.find_iter(s).map(|m| (m.start(), m.end())).collect()
}

fn split_on<F>(line: &str, delimiters: F) -> Vec<TableCell>
where
    F: Fn(&str) -> Vec<(usize, usize)>,
{
    let mut cells = Vec::new();
    let mut start = 0;
    let mut push = |from: usize, to: usize| {
        let raw = &line[from..to];
        let text = raw.trim();
        if !text.is_empty() {
            let lead = raw.len() - raw.trim_start().len();
            cells.push(TableCell {
                text: text.to_string(),
                start: from + lead,
            });
        }
    };
    for (d_start, d_end) in delimiters(line) {
        push(start, d_start);
        start = d_end;
    }
    push(start, line.len());
    cells
}

/// Whether a line is a dashed / underscored / equals separator row.
pub fn is_separator_row(line: &str) -> bool {
    SEPARATOR_ROW.is_match(line)
}

/// Detect every table region in the document.
///
/// A space-aligned row needs at least three cells, unless a separator row
/// directly below the header marks it, in which case two cells suffice for
/// the header and every row of the region.
pub fn detect_regions(lines: &[DocumentLine]) -> Vec<TableRegion> {
    let mut regions = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let Some((separator, cells)) = (!is_separator_row(&line.text))
            .then(|| split_row(&line.text))
            .flatten()
        else {
            i += 1;
            continue;
        };

        let underlined = lines
            .get(i + 1)
            .is_some_and(|next| next.page == line.page && is_separator_row(&next.text));
        let min_cells = if separator == ColumnSeparator::Spaces && !underlined {
            3
        } else {
            2
        };
        if cells.len() < min_cells {
            i += 1;
            continue;
        }

        let mut rows = Vec::new();
        let mut j = if underlined { i + 2 } else { i + 1 };
        while j < lines.len() && lines[j].page == line.page {
            let text = &lines[j].text;
            if text.trim().is_empty() || is_separator_row(text) {
                j += 1;
                continue;
            }
            match split_row(text) {
                Some((sep, row_cells)) if sep == separator && row_cells.len() >= min_cells => {
                    rows.push(TableRow {
                        line: j,
                        cells: row_cells,
                    });
                    j += 1;
                }
                _ => break,
            }
        }

        match rows.last() {
            Some(last) => {
                let next = last.line + 1;
                regions.push(TableRegion {
                    separator,
                    header: TableRow { line: i, cells },
                    rows,
                    underlined,
                });
                i = next;
            }
            None => i += 1,
        }
    }

    regions
}
