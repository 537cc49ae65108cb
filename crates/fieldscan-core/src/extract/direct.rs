//! Pass 1: schema regex patterns over the joined text.

use tracing::trace;

use super::{DocumentView, Pass, PassContext};
use crate::models::{Candidate, Provenance};
use crate::schema::FieldDefinition;

/// Tries each field's patterns in priority order; the first match that
/// validates is the field's only direct candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMatcher;

impl DirectMatcher {
    /// Confidence for a match of the pattern at `priority`.
    pub fn confidence(priority: usize) -> f32 {
        (1.0 - 0.01 * priority as f32).clamp(0.90, 1.0)
    }

    fn first_match(field: &FieldDefinition, view: &DocumentView<'_>) -> Option<Candidate> {
        let text = view.text();
        for pattern in &field.patterns {
            for caps in pattern.regex.captures_iter(text) {
                let Some(value) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                let offset = value.start();
                let Some(candidate) = field.candidate(
                    value.as_str(),
                    Self::confidence(pattern.priority),
                    Provenance::Direct,
                    view.page_at(offset),
                    offset,
                ) else {
                    trace!(
                        "{}: pattern {} matched '{}' but it failed validation",
                        field.id,
                        pattern.priority,
                        value.as_str()
                    );
                    continue;
                };

                let candidate = candidate.with_pattern(pattern.priority);
                let label = caps
                    .get(0)
                    .map(|whole| label_text(&text[whole.start()..offset]))
                    .unwrap_or_default();
                return Some(if label.is_empty() {
                    candidate
                } else {
                    candidate.with_label(label)
                });
            }
        }
        None
    }
}

impl Pass for DirectMatcher {
    fn provenance(&self) -> Provenance {
        Provenance::Direct
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Candidate> {
        ctx.open
            .iter()
            .filter_map(|idx| Self::first_match(ctx.schema.field(idx), ctx.view))
            .collect()
    }
}

// Text of a match before its captured value, minus delimiters.
fn label_text(prefix: &str) -> String {
    prefix
        .trim()
        .trim_end_matches(|c: char| c.is_whitespace() || ":#-|".contains(c))
        .to_string()
}
