//! Pass 3: header and key/value cells of detected tables.

use std::collections::HashSet;

use super::layout::{TableCell, TableRegion, TableRow};
use super::{Pass, PassContext};
use crate::models::{Candidate, Provenance};
use crate::schema::FieldSchema;

/// Header cell exactly equal to an alias.
pub const EXACT_HEADER_CONFIDENCE: f32 = 0.77;
/// Alias contained in a header cell.
pub const CONTAINED_HEADER_CONFIDENCE: f32 = 0.75;
/// Label cell followed by a value cell on the same row.
pub const KEY_VALUE_CONFIDENCE: f32 = 0.72;

/// How well a cell matches an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LabelQuality {
    Exact,
    Contained,
}

impl LabelQuality {
    fn confidence(self) -> f32 {
        match self {
            LabelQuality::Exact => EXACT_HEADER_CONFIDENCE,
            LabelQuality::Contained => CONTAINED_HEADER_CONFIDENCE,
        }
    }
}

/// Fields whose alias a cell holds, with match quality, in schema order.
///
/// A cell holding `label: value` is a value cell, not a label, and matches
/// nothing.
pub(crate) fn label_matches(schema: &FieldSchema, cell: &str) -> Vec<(usize, LabelQuality)> {
    let label = cell
        .trim()
        .trim_end_matches(|c: char| c.is_whitespace() || ":.#-".contains(c));
    if label.is_empty() || label.contains(':') {
        return Vec::new();
    }

    let mut matches: Vec<(usize, LabelQuality)> = Vec::new();
    for hit in schema.aliases().find(label) {
        let quality = if hit.start == 0 && hit.end == label.len() {
            LabelQuality::Exact
        } else {
            LabelQuality::Contained
        };
        match matches.iter_mut().find(|(field, _)| *field == hit.field) {
            Some(existing) => existing.1 = existing.1.min(quality),
            None => matches.push((hit.field, quality)),
        }
    }
    matches.sort_by_key(|(field, _)| *field);
    matches
}

pub(crate) fn is_label(schema: &FieldSchema, cell: &str) -> bool {
    !label_matches(schema, cell).is_empty()
}

/// Whether a region's first row is a column header.
///
/// A header is underlined or holds at least two label cells. A row with a
/// single label cell is a header when its other cells hold no digits and the
/// first aligned row below it holds no label; otherwise it reads as a
/// `label | value` row.
pub(crate) fn is_header_row(schema: &FieldSchema, region: &TableRegion) -> bool {
    if region.underlined {
        return true;
    }
    let (labels, others): (Vec<&TableCell>, Vec<&TableCell>) = region
        .header
        .cells
        .iter()
        .partition(|c| is_label(schema, &c.text));

    match labels.len() {
        0 => false,
        1 => {
            others
                .iter()
                .all(|c| !c.text.chars().any(|ch| ch.is_ascii_digit()))
                && region
                    .aligned_rows()
                    .next()
                    .is_some_and(|row| !row.cells.iter().any(|c| is_label(schema, &c.text)))
        }
        _ => true,
    }
}

/// Reads values from the column under a matched header, or from the cell
/// right of a matched label.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableMatcher;

impl TableMatcher {
    fn header_candidates(ctx: &PassContext<'_>, region: &TableRegion, out: &mut Vec<Candidate>) {
        for (col, header) in region.header.cells.iter().enumerate() {
            for (field, quality) in label_matches(ctx.schema, &header.text) {
                if !ctx.open.contains(field) {
                    continue;
                }
                // First aligned row with a non-empty, non-label cell in this column.
                let Some((row, cell)) = region.aligned_rows().find_map(|row| {
                    row.cell(col)
                        .filter(|c| !c.text.is_empty() && !is_label(ctx.schema, &c.text))
                        .map(|c| (row, c))
                }) else {
                    continue;
                };
                if let Some(candidate) =
                    Self::candidate(ctx, field, row, cell, quality.confidence(), &header.text)
                {
                    out.push(candidate);
                }
            }
        }
    }

    fn key_value_candidates(
        ctx: &PassContext<'_>,
        region: &TableRegion,
        out: &mut Vec<Candidate>,
    ) {
        // Cells beside a column header are other headers, not values.
        let skip = usize::from(is_header_row(ctx.schema, region));
        for row in region.all_rows().skip(skip) {
            for pair in row.cells.windows(2) {
                let (key, value) = (&pair[0], &pair[1]);
                if is_label(ctx.schema, &value.text) {
                    continue;
                }
                for (field, _) in label_matches(ctx.schema, &key.text) {
                    if !ctx.open.contains(field) {
                        continue;
                    }
                    if let Some(candidate) =
                        Self::candidate(ctx, field, row, value, KEY_VALUE_CONFIDENCE, &key.text)
                    {
                        out.push(candidate);
                    }
                }
            }
        }
    }

    fn candidate(
        ctx: &PassContext<'_>,
        field: usize,
        row: &TableRow,
        cell: &TableCell,
        confidence: f32,
        label: &str,
    ) -> Option<Candidate> {
        let line = &ctx.view.lines()[row.line];
        ctx.schema
            .field(field)
            .candidate(
                &cell.text,
                confidence,
                Provenance::Table,
                line.page,
                ctx.view.line_offset(row.line) + cell.start,
            )
            .map(|c| c.with_label(label))
    }
}

impl Pass for TableMatcher {
    fn provenance(&self) -> Provenance {
        Provenance::Table
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Candidate> {
        let mut out = Vec::new();
        for region in ctx.view.tables() {
            Self::header_candidates(ctx, region, &mut out);
            Self::key_value_candidates(ctx, region, &mut out);
        }

        // A cell read both as a column value and as a key/value pair counts once.
        let mut seen = HashSet::new();
        out.retain(|c| seen.insert((c.field.clone(), c.offset)));
        out
    }
}
