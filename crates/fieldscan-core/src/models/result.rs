//! Per-document extraction result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::candidate::{Candidate, Provenance};

/// Resolution state of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    /// No surviving candidate.
    Unresolved,
    /// A winner was selected.
    Resolved,
}

/// Winners and retained candidates for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Winning candidate per resolved field. Unresolved fields are absent.
    pub fields: BTreeMap<String, Candidate>,
    /// Every candidate that survived validation, in pass order.
    pub candidates: Vec<Candidate>,
    /// Unresolved field ids, in schema order.
    pub missing: Vec<String>,
}

impl ExtractionResult {
    /// Winning candidate for a field.
    pub fn get(&self, field: &str) -> Option<&Candidate> {
        self.fields.get(field)
    }

    /// Winning value for a field.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|c| c.value.as_str())
    }

    pub fn status(&self, field: &str) -> FieldStatus {
        if self.fields.contains_key(field) {
            FieldStatus::Resolved
        } else {
            FieldStatus::Unresolved
        }
    }

    /// Number of resolved fields.
    pub fn found_count(&self) -> usize {
        self.fields.len()
    }

    /// Candidates that did not win, for audit.
    pub fn runners_up(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |c| self.fields.get(&c.field) != Some(*c))
    }

    /// All retained candidates for one field.
    pub fn candidates_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Candidate> {
        self.candidates.iter().filter(move |c| c.field == field)
    }

    /// Mean confidence of the winners, or 0 when nothing was found.
    pub fn average_confidence(&self) -> f32 {
        if self.fields.is_empty() {
            return 0.0;
        }
        self.fields.values().map(|c| c.confidence).sum::<f32>() / self.fields.len() as f32
    }

    /// Number of winners per provenance tier.
    pub fn provenance_counts(&self) -> BTreeMap<Provenance, usize> {
        let mut counts = BTreeMap::new();
        for winner in self.fields.values() {
            *counts.entry(winner.provenance).or_insert(0) += 1;
        }
        counts
    }
}
