//! Pass 4: approximate label matching for fields still unresolved.

use strsim::normalized_levenshtein;
use tracing::trace;

use super::contextual::{foreign_label_start, value_below};
use super::{FieldSet, Pass, PassContext};
use crate::models::{Candidate, Provenance};
use crate::schema::normalize_label;

/// Tolerance for comparing a similarity against the threshold.
const SIMILARITY_EPSILON: f64 = 1e-6;

const MAX_CONFIDENCE: f32 = 0.79;

/// Whether a similarity clears the (inclusive) threshold.
pub fn is_label_hit(similarity: f64, threshold: f32) -> bool {
    similarity + SIMILARITY_EPSILON >= threshold as f64
}

/// Confidence for a fuzzy hit of the given similarity.
pub fn fuzzy_confidence(similarity: f64) -> f32 {
    ((0.60 + 0.20 * similarity) as f32).min(MAX_CONFIDENCE)
}

/// Label text of a line and the byte offset where the rest begins.
///
/// The label runs up to the first colon, pipe, tab, double space or spaced
/// dash (` - `). Returns `None` for a line without a delimiter.
fn split_label(line: &str) -> Option<(&str, usize)> {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let next = bytes.get(i + 1).copied();
        let double_space = b == b' ' && next == Some(b' ');
        let spaced_dash = b == b' ' && next == Some(b'-') && bytes.get(i + 2) == Some(&b' ');
        if b == b':' || b == b'|' || b == b'\t' || double_space || spaced_dash {
            let rest = line[i..]
                .find(|c: char| !(c.is_whitespace() || ":|-".contains(c)))
                .map_or(line.len(), |r| i + r);
            return Some((&line[..i], rest));
        }
    }
    None
}

/// Byte offset just past the first `words` words of `line`.
fn word_window_end(line: &str, words: usize) -> Option<usize> {
    let mut seen = 0;
    let mut in_word = false;
    for (i, c) in line.char_indices() {
        if c.is_alphanumeric() {
            in_word = true;
        } else if in_word {
            in_word = false;
            seen += 1;
            if seen == words {
                return Some(i);
            }
        }
    }
    (in_word && seen + 1 == words).then_some(line.len())
}

/// A line's label matched against one field.
struct LabelHit {
    similarity: f64,
    /// Byte offset in the line where the value search starts.
    rest: usize,
    /// Byte offset in the line where the label ends.
    label_end: usize,
}

/// Approximate label matching with normalized Levenshtein similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatcher;

impl FuzzyMatcher {
    /// Best similarity between a normalized label and any alias of `field`.
    fn best_similarity(
        ctx: &PassContext<'_>,
        field: usize,
        label: &str,
        threshold: f32,
    ) -> Option<f64> {
        let label_len = label.chars().count();
        ctx.schema
            .aliases()
            .for_field(field)
            .filter(|entry| {
                // Length difference alone bounds the similarity from above.
                let alias_len = entry.normalized.chars().count();
                let longest = label_len.max(alias_len);
                let bound = 1.0 - label_len.abs_diff(alias_len) as f64 / longest.max(1) as f64;
                is_label_hit(bound, threshold)
            })
            .map(|entry| normalized_levenshtein(label, &entry.normalized))
            .filter(|sim| is_label_hit(*sim, threshold))
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Compare the leading words of a line, as many as each multi-word
    /// alias has, against that alias.
    ///
    /// Used when the line has no delimiter or its delimited label is too
    /// long. Single-word aliases are too ambiguous to match this way.
    fn best_window(ctx: &PassContext<'_>, field: usize, line: &str) -> Option<LabelHit> {
        let config = ctx.config;
        let mut best: Option<LabelHit> = None;

        for entry in ctx.schema.aliases().for_field(field) {
            let words = entry.normalized.split(' ').count();
            if words < 2 {
                continue;
            }
            let Some(end) = word_window_end(line, words) else {
                continue;
            };
            if line[..end].trim().chars().count() > config.fuzzy_label_max_len {
                continue;
            }
            let window = normalize_label(&line[..end]);
            if is_alias(ctx, &window) {
                continue;
            }
            let similarity = normalized_levenshtein(&window, &entry.normalized);
            if !is_label_hit(similarity, config.fuzzy_threshold) {
                continue;
            }
            if best.as_ref().is_none_or(|b| similarity > b.similarity) {
                let rest = line[end..]
                    .find(|c: char| !(c.is_whitespace() || ":|-.#".contains(c)))
                    .map_or(line.len(), |r| end + r);
                best = Some(LabelHit {
                    similarity,
                    rest,
                    label_end: end,
                });
            }
        }
        best
    }

    /// Match a line's label against `field`.
    fn label_hit(
        ctx: &PassContext<'_>,
        field: usize,
        line: &str,
        delimited: Option<(&str, usize)>,
    ) -> Option<LabelHit> {
        let config = ctx.config;
        let (label, rest) = delimited.unwrap_or((line, line.len()));
        if label.trim().chars().count() <= config.fuzzy_label_max_len {
            let normalized = normalize_label(label);
            if !normalized.is_empty() && !is_alias(ctx, &normalized) {
                if let Some(similarity) =
                    Self::best_similarity(ctx, field, &normalized, config.fuzzy_threshold)
                {
                    return Some(LabelHit {
                        similarity,
                        rest,
                        label_end: label.len(),
                    });
                }
            }
        }
        // Undelimited or over-long labels: try the alias-sized window.
        if delimited.is_none() || label.trim().chars().count() > config.fuzzy_label_max_len {
            return Self::best_window(ctx, field, line);
        }
        None
    }
}

// A label spelled exactly like an alias was the contextual pass's to take.
fn is_alias(ctx: &PassContext<'_>, normalized: &str) -> bool {
    ctx.schema
        .aliases()
        .entries()
        .iter()
        .any(|e| e.normalized == normalized)
}

impl Pass for FuzzyMatcher {
    fn provenance(&self) -> Provenance {
        Provenance::Fuzzy
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Candidate> {
        let config = ctx.config;
        let lines = ctx.view.lines();
        let mut open: FieldSet = ctx.open.clone();
        let mut out = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if open.is_empty() {
                break;
            }
            let text = line.text.as_str();
            if text.trim().is_empty() {
                continue;
            }
            let delimited = split_label(text);
            let hits = ctx.schema.aliases().find(text);

            let fields: Vec<usize> = open.iter().collect();
            for field_idx in fields {
                let Some(hit) = Self::label_hit(ctx, field_idx, text, delimited) else {
                    continue;
                };
                let field = ctx.schema.field(field_idx);
                trace!(
                    "fuzzy label '{}' ~ {} ({:.3})",
                    &text[..hit.label_end],
                    field.id,
                    hit.similarity
                );

                let stop = foreign_label_start(&hits, field_idx, hit.rest).unwrap_or(text.len());
                let found = field
                    .first_value(&text[hit.rest..stop.max(hit.rest)])
                    .map(|(off, raw, _)| (idx, hit.rest + off, raw))
                    .or_else(|| value_below(ctx, field_idx, idx, config.fuzzy_lookahead));

                let Some((value_line, col, raw)) = found else {
                    continue;
                };
                if let Some(candidate) = field.candidate(
                    raw,
                    fuzzy_confidence(hit.similarity),
                    Provenance::Fuzzy,
                    lines[value_line].page,
                    ctx.view.line_offset(value_line) + col,
                ) {
                    let anchor = text[..hit.label_end].trim_end_matches(|c: char| {
                        c.is_whitespace() || ":|-".contains(c)
                    });
                    out.push(candidate.with_label(anchor.trim()));
                    open.remove(field_idx);
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DocumentView;
    use crate::models::{ExtractionConfig, RawDocument};
    use crate::schema::FieldSchema;
    use pretty_assertions::assert_eq;

    fn run_with(text: &str, config: ExtractionConfig) -> Vec<Candidate> {
        let schema = FieldSchema::builtin().unwrap();
        let doc = RawDocument::from_text(text);
        let view = DocumentView::new(&doc);
        let open = FieldSet::all(schema.len());
        let ctx = PassContext {
            view: &view,
            schema: &schema,
            open: &open,
            config: &config,
        };
        FuzzyMatcher.run(&ctx)
    }

    fn run(text: &str) -> Vec<Candidate> {
        run_with(text, ExtractionConfig::default())
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(is_label_hit(0.70, 0.70));
        assert!(!is_label_hit(0.69, 0.70));
        assert!(is_label_hit(1.0, 0.70));
    }

    #[test]
    fn test_confidence_band() {
        assert!((fuzzy_confidence(0.70) - 0.74).abs() < 1e-6);
        assert_eq!(fuzzy_confidence(1.0), MAX_CONFIDENCE);
    }

    #[test]
    fn test_split_label() {
        assert_eq!(split_label("Polcy No: XYZ555"), Some(("Polcy No", 10)));
        assert_eq!(split_label("Engin Numbr  K12"), Some(("Engin Numbr", 13)));
        assert_eq!(split_label("Polcy No - XYZ555"), Some(("Polcy No", 11)));
        assert_eq!(split_label("OG-24-1234 issued"), None);
        assert_eq!(split_label("just text"), None);
    }

    #[test]
    fn test_word_window_end() {
        assert_eq!(word_window_end("Polcy No XYZ555", 2), Some(8));
        assert_eq!(word_window_end("Polcy No", 2), Some(8));
        assert_eq!(word_window_end("Polcy", 2), None);
    }

    #[test]
    fn test_threshold_boundary_in_pass() {
        // "chazzis mo" is three edits from "chassis no": similarity 0.70.
        let found = run("Chazzis Mo: MA3EXA12345678901");
        let chassis = found.iter().find(|c| c.field == "chassis_no").unwrap();
        assert_eq!(chassis.value, "MA3EXA12345678901");
        assert!((chassis.confidence - 0.74).abs() < 1e-6);

        let stricter = ExtractionConfig {
            fuzzy_threshold: 0.71,
            ..ExtractionConfig::default()
        };
        assert!(run_with("Chazzis Mo: MA3EXA12345678901", stricter).is_empty());

        // Four edits from "cheque number": similarity 0.69.
        assert!(run("Chequx Numzzz: 458812").is_empty());
    }

    #[test]
    fn test_dash_delimiter() {
        let found = run("Polcy No - XYZ555");
        let policy = found.iter().find(|c| c.field == "policy_no").unwrap();
        assert_eq!(policy.value, "XYZ555");
        assert_eq!(policy.label.as_deref(), Some("Polcy No"));
    }

    #[test]
    fn test_undelimited_label_uses_alias_window() {
        let found = run("Polcy No XYZ555");
        let policy = found.iter().find(|c| c.field == "policy_no").unwrap();

        assert_eq!(policy.value, "XYZ555");
        assert!(policy.confidence >= 0.76 && policy.confidence <= 0.78);
        assert_eq!(policy.label.as_deref(), Some("Polcy No"));
    }

    #[test]
    fn test_lookahead_stops_at_other_label() {
        let found = run("Chasis Numbr\nEngine No: K12MN123456");
        assert!(found.iter().all(|c| c.field != "chassis_no"));
    }

    #[test]
    fn test_misspelled_label() {
        let found = run("Polcy No: XYZ555");
        let policy = found.iter().find(|c| c.field == "policy_no").unwrap();

        assert_eq!(policy.value, "XYZ555");
        assert_eq!(policy.provenance, Provenance::Fuzzy);
        assert!(policy.confidence >= 0.76 && policy.confidence <= 0.78);
        assert_eq!(policy.label.as_deref(), Some("Polcy No"));
    }

    #[test]
    fn test_value_on_following_line() {
        let found = run("Chasis Numbr\nMA3EXA12345678901");
        let chassis = found.iter().find(|c| c.field == "chassis_no").unwrap();
        assert_eq!(chassis.value, "MA3EXA12345678901");
    }

    #[test]
    fn test_field_closed_after_first_candidate() {
        let found = run("Polcy No: XYZ555\nPolicy Nmbr: QRS777");
        let policies: Vec<_> = found.iter().filter(|c| c.field == "policy_no").collect();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].value, "XYZ555");
    }

    #[test]
    fn test_dissimilar_labels_ignored() {
        assert!(run("Weather Today: Sunny 25").is_empty());
    }

    #[test]
    fn test_long_labels_ignored() {
        let config = ExtractionConfig {
            fuzzy_label_max_len: 5,
            ..ExtractionConfig::default()
        };
        assert!(run_with("Polcy No: XYZ555", config).is_empty());
    }

    #[test]
    fn test_exact_alias_lines_left_alone() {
        assert!(run("Insurer Name: Acme General Insurance").is_empty());
    }
}
