//! Pass 2: alias labels with a value on the same line or just below.

use lazy_static::lazy_static;
use regex::Regex;

use super::table::is_header_row;
use super::{Pass, PassContext};
use crate::models::{Candidate, Provenance};
use crate::rules::patterns::COLUMN_GAP;
use crate::schema::AliasHit;

lazy_static! {
    // Delimiter after a label: optional "." or "#", then a colon, dash or
    // pipe, a tab, or a run of two or more spaces.
    static ref LABEL_DELIMITER: Regex =
        Regex::new(r"^[ \t]*[.#]?(?:[ \t]*[:|\-][ \t]*|[ \t]*\t[ \t]*| {2,})").unwrap();
}

/// Confidence for a value found on the label line.
pub const SAME_LINE_CONFIDENCE: f32 = 0.89;
/// Lowest contextual confidence.
pub const MIN_CONFIDENCE: f32 = 0.80;

/// Confidence for a value `distance` lines below its label.
pub fn distance_confidence(distance: usize) -> f32 {
    (SAME_LINE_CONFIDENCE - 0.01 * distance as f32).max(MIN_CONFIDENCE)
}

/// Byte range of the value segment following a label that ends at `end`.
///
/// The segment starts after the delimiter and stops at the next column
/// delimiter. Returns `None` when no delimiter follows the label.
pub(crate) fn value_segment(line: &str, end: usize) -> Option<(usize, usize)> {
    let rest = &line[end..];
    let delim = LABEL_DELIMITER.find(rest)?;
    let start = end + delim.end();
    let tail = &line[start..];
    let stop = [
        COLUMN_GAP.find(tail).map(|m| m.start()),
        tail.find('|'),
    ]
    .into_iter()
    .flatten()
    .min()
    .unwrap_or(tail.len());
    Some((start, start + stop))
}

/// Start of the first label of a field other than `field` at or after `from`.
///
/// Text from there on belongs to that other label. `hits` must be sorted by
/// start, as [`crate::schema::AliasIndex::find`] returns them.
pub(crate) fn foreign_label_start(
    hits: &[AliasHit<'_>],
    field: usize,
    from: usize,
) -> Option<usize> {
    hits.iter()
        .find(|h| h.field != field && h.start >= from)
        .map(|h| h.start)
}

/// Nearest value for `field` on the `lookahead` lines below line `idx`.
///
/// The search stays on the label's page and stops at a line carrying a
/// label of another field; only the text before that label is searched.
/// Returns the line index, the byte column and the raw token.
pub(crate) fn value_below<'a>(
    ctx: &PassContext<'a>,
    field: usize,
    idx: usize,
    lookahead: usize,
) -> Option<(usize, usize, &'a str)> {
    let lines = ctx.view.lines();
    let definition = ctx.schema.field(field);
    let page = lines[idx].page;

    for (n, next) in lines.iter().enumerate().skip(idx + 1).take(lookahead) {
        if next.page != page {
            break;
        }
        let hits = ctx.schema.aliases().find(&next.text);
        let stop = foreign_label_start(&hits, field, 0);
        let window = &next.text[..stop.unwrap_or(next.text.len())];
        if let Some((col, raw, _)) = definition.first_value(window) {
            return Some((n, col, raw));
        }
        if stop.is_some() {
            break;
        }
    }
    None
}

/// Finds alias labels line by line and reads the nearest value-shaped
/// token after them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextualMatcher;

impl Pass for ContextualMatcher {
    fn provenance(&self) -> Provenance {
        Provenance::Contextual
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Candidate> {
        let lines = ctx.view.lines();
        let lookahead = ctx.config.context_lookahead;
        let mut out = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            // Column headers belong to the table pass.
            if ctx
                .view
                .table_at(idx)
                .is_some_and(|t| t.first_line() == idx && is_header_row(ctx.schema, t))
            {
                continue;
            }

            let hits = ctx.schema.aliases().find(&line.text);
            for hit in &hits {
                if !ctx.open.contains(hit.field) {
                    continue;
                }
                let field = ctx.schema.field(hit.field);

                let same_line = value_segment(&line.text, hit.end).and_then(|(start, end)| {
                    let end = foreign_label_start(&hits, hit.field, start)
                        .map_or(end, |label| label.min(end));
                    field
                        .first_value(&line.text[start..end])
                        .map(|(off, raw, _)| (idx, start + off, raw))
                });

                let found = same_line.or_else(|| value_below(ctx, hit.field, idx, lookahead));

                let Some((value_line, col, raw)) = found else {
                    continue;
                };
                let candidate = field.candidate(
                    raw,
                    distance_confidence(value_line - idx),
                    Provenance::Contextual,
                    lines[value_line].page,
                    ctx.view.line_offset(value_line) + col,
                );
                if let Some(candidate) = candidate {
                    out.push(candidate.with_label(&line.text[hit.start..hit.end]));
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{DocumentView, FieldSet};
    use crate::models::{ExtractionConfig, RawDocument};
    use crate::schema::FieldSchema;
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> Vec<Candidate> {
        let schema = FieldSchema::builtin().unwrap();
        let doc = RawDocument::from_text(text);
        let view = DocumentView::new(&doc);
        let open = FieldSet::all(schema.len());
        let config = ExtractionConfig::default();
        let ctx = PassContext {
            view: &view,
            schema: &schema,
            open: &open,
            config: &config,
        };
        ContextualMatcher.run(&ctx)
    }

    #[test]
    fn test_distance_confidence() {
        assert_eq!(distance_confidence(0), 0.89);
        assert!((distance_confidence(3) - 0.86).abs() < 1e-6);
        assert_eq!(distance_confidence(50), MIN_CONFIDENCE);
    }

    #[test]
    fn test_value_segment() {
        let line = "Policy No.:  ABC123    Insured: John";
        let (start, end) = value_segment(line, 9).unwrap();
        assert_eq!(&line[start..end], "ABC123");

        assert_eq!(value_segment("Policy No ABC123", 9), None);
        let line = "Engine No | K12MN123456 | x";
        let (start, end) = value_segment(line, 9).unwrap();
        assert_eq!(&line[start..end], "K12MN123456 ");
    }

    #[test]
    fn test_value_on_next_line() {
        let found = run("Certificate Number\nABC98765");
        let policy = found.iter().find(|c| c.field == "policy_no").unwrap();

        assert_eq!(policy.value, "ABC98765");
        assert_eq!(policy.provenance, Provenance::Contextual);
        assert!((policy.confidence - 0.88).abs() < 1e-6);
        assert_eq!(policy.label.as_deref(), Some("Certificate Number"));
    }

    #[test]
    fn test_same_line_keeps_casing() {
        let found = run("Name of Insured -  Ramesh Kumar     Policy Ref: OG-24-1234");
        let insured = found.iter().find(|c| c.field == "insured_name").unwrap();
        assert_eq!(insured.raw, "Ramesh Kumar");
        assert_eq!(insured.confidence, SAME_LINE_CONFIDENCE);

        let policy = found.iter().find(|c| c.field == "policy_no").unwrap();
        assert_eq!(policy.value, "OG-24-1234");
    }

    #[test]
    fn test_lookahead_limit() {
        let found = run("Engine Number\n\n\n\nK12MN123456");
        assert!(found.iter().all(|c| c.field != "engine_no"));

        let found = run("Engine Number\n\n\nK12MN123456");
        let engine = found.iter().find(|c| c.field == "engine_no").unwrap();
        assert!((engine.confidence - 0.86).abs() < 1e-6);
    }

    #[test]
    fn test_lookahead_stops_at_other_label() {
        let found = run("Engine Number\nChassis No: MA3EXA12345678901");
        assert!(found.iter().all(|c| c.field != "engine_no"));
        let chassis = found.iter().find(|c| c.field == "chassis_no").unwrap();
        assert_eq!(chassis.value, "MA3EXA12345678901");

        let found = run("PREMIUM DETAILS\nNet OD Premium: Rs. 8,450.00");
        assert!(found.iter().all(|c| c.field != "total_premium"));
    }

    #[test]
    fn test_lookahead_reads_text_before_other_label() {
        let found = run("Policy Number\nABC98765   Insured: John Doe");
        let policy = found.iter().find(|c| c.field == "policy_no").unwrap();
        assert_eq!(policy.value, "ABC98765");
        assert!((policy.confidence - 0.88).abs() < 1e-6);
    }

    #[test]
    fn test_same_line_value_ends_at_next_label() {
        let found = run("Insured: John Doe Policy No: ABC123");
        let insured = found.iter().find(|c| c.field == "insured_name").unwrap();
        assert_eq!(insured.value, "John Doe");
        assert_eq!(insured.confidence, SAME_LINE_CONFIDENCE);
    }

    #[test]
    fn test_name_ignores_code_tokens() {
        let found = run("Insured Name\nABC12345");
        assert!(found.iter().all(|c| c.field != "insured_name"));
    }

    #[test]
    fn test_single_label_header_left_to_table() {
        let found = run("Insured Name | Address\nJohn Doe | Mumbai");
        assert!(found.iter().all(|c| c.field != "insured_name"));
    }

    #[test]
    fn test_header_rows_are_skipped() {
        let found = run("Policy No | Insured Name\nABC111 | John Doe");
        assert!(found.is_empty());
    }
}
