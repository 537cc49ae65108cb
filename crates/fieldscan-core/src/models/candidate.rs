//! Provisional extracted values and their provenance.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The pass that produced a candidate.
///
/// Declaration order is tier order: earlier variants outrank later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Pass 1: schema regex matched directly.
    Direct,
    /// Pass 2: alias label found, value nearby.
    Contextual,
    /// Pass 3: header or key cell in a detected table.
    Table,
    /// Pass 4: approximate label match.
    Fuzzy,
}

impl Provenance {
    /// All tiers in pipeline order.
    pub const ALL: [Provenance; 4] = [
        Provenance::Direct,
        Provenance::Contextual,
        Provenance::Table,
        Provenance::Fuzzy,
    ];

    /// Tier rank, 0 being the strongest.
    pub fn tier(self) -> u8 {
        self as u8
    }

    /// Inclusive confidence range a candidate of this tier may carry.
    pub fn confidence_range(self) -> (f32, f32) {
        match self {
            Provenance::Direct => (0.90, 1.00),
            Provenance::Contextual => (0.80, 0.89),
            Provenance::Table => (0.70, 0.79),
            Provenance::Fuzzy => (0.60, 0.79),
        }
    }

    /// Lowercase tag used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Direct => "direct",
            Provenance::Contextual => "contextual",
            Provenance::Table => "table",
            Provenance::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisional value for one field.
///
/// Passes build candidates through [`crate::schema::FieldDefinition::candidate`],
/// which runs the field's validator, so every pass output holds a cleaned value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Field id.
    pub field: String,
    /// Text as matched in the document.
    pub raw: String,
    /// Cleaned, normalized value.
    pub value: String,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Pass that produced the candidate.
    pub provenance: Provenance,
    /// Page the value was found on.
    pub page: u32,
    /// Approximate byte offset into the joined document text.
    pub offset: usize,
    /// Alias or label text that anchored the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Pattern priority index (direct matches only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<usize>,
    /// Document text around the value, whitespace collapsed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

impl Candidate {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_pattern(mut self, priority: usize) -> Self {
        self.pattern = Some(priority);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Ranking order: higher confidence first, then stronger tier, then
    /// pattern priority, then earliest page and offset.
    pub fn rank(&self, other: &Candidate) -> Ordering {
        other
            .confidence
            .partial_cmp(&self.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.provenance.cmp(&other.provenance))
            .then_with(|| {
                self.pattern
                    .unwrap_or(usize::MAX)
                    .cmp(&other.pattern.unwrap_or(usize::MAX))
            })
            .then_with(|| self.page.cmp(&other.page))
            .then_with(|| self.offset.cmp(&other.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(confidence: f32, provenance: Provenance, offset: usize) -> Candidate {
        Candidate {
            field: "policy_no".to_string(),
            raw: "A1234".to_string(),
            value: "A1234".to_string(),
            confidence,
            provenance,
            page: 1,
            offset,
            label: None,
            pattern: None,
            context: String::new(),
        }
    }

    #[test]
    fn test_tier_order() {
        assert!(Provenance::Direct < Provenance::Contextual);
        assert!(Provenance::Table < Provenance::Fuzzy);
        assert_eq!(Provenance::Fuzzy.tier(), 3);
    }

    #[test]
    fn test_rank_prefers_confidence_then_tier_then_offset() {
        let strong = candidate(0.95, Provenance::Direct, 50);
        let weak = candidate(0.85, Provenance::Contextual, 0);
        assert_eq!(strong.rank(&weak), Ordering::Less);

        let table = candidate(0.75, Provenance::Table, 90);
        let fuzzy = candidate(0.75, Provenance::Fuzzy, 10);
        assert_eq!(table.rank(&fuzzy), Ordering::Less);

        let early = candidate(0.88, Provenance::Contextual, 10);
        let late = candidate(0.88, Provenance::Contextual, 20);
        assert_eq!(early.rank(&late), Ordering::Less);
    }

    #[test]
    fn test_provenance_serializes_lowercase() {
        let json = serde_json::to_string(&Provenance::Contextual).unwrap();
        assert_eq!(json, "\"contextual\"");
    }
}
