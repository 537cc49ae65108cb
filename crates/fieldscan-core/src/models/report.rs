//! Batch-level report assembled from per-document results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::candidate::Provenance;
use super::result::ExtractionResult;
use crate::error::DocumentError;

/// What happened to one document in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// Extraction completed; some fields may still be missing.
    Extracted { result: ExtractionResult },
    /// The document failed (empty, unreadable, timed out).
    Failed { reason: String },
    /// The batch was cancelled before this document completed.
    Cancelled,
}

impl DocumentOutcome {
    pub fn from_result(result: Result<ExtractionResult, DocumentError>) -> Self {
        match result {
            Ok(result) => DocumentOutcome::Extracted { result },
            Err(DocumentError::Cancelled) => DocumentOutcome::Cancelled,
            Err(e) => DocumentOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        match self {
            DocumentOutcome::Extracted { result } => Some(result),
            _ => None,
        }
    }
}

/// Outcome for one document, keyed by its source id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Source document id (usually a file path).
    pub document: String,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
    /// Wall time spent on the document in milliseconds.
    pub processing_time_ms: u64,
}

/// Aggregate statistics for one field across a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Documents where the field was resolved.
    pub found: usize,
    /// Documents where the field was not resolved (failed documents included).
    pub missing: usize,
    /// Mean winning confidence.
    pub average_confidence: f32,
    /// Lowest winning confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f32>,
    /// Highest winning confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_confidence: Option<f32>,
    /// Winners per provenance tier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_provenance: BTreeMap<Provenance, usize>,
}

impl FieldStats {
    pub fn found_rate(&self) -> f32 {
        let total = self.found + self.missing;
        if total == 0 {
            0.0
        } else {
            self.found as f32 / total as f32
        }
    }
}

/// Per-document outcomes plus per-field statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Documents in input order.
    pub documents: Vec<DocumentReport>,
    /// Statistics per field id, for every field in the schema.
    pub fields: BTreeMap<String, FieldStats>,
    /// Documents that extracted successfully.
    pub extracted: usize,
    /// Documents that failed.
    pub failed: usize,
    /// Documents skipped by cancellation.
    pub cancelled: usize,
}

impl BatchReport {
    /// Build the report from per-document outcomes.
    ///
    /// Cancelled documents do not count towards field statistics; failed
    /// documents count every field as missing.
    pub fn from_documents<'a, I>(field_ids: I, documents: Vec<DocumentReport>) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fields: BTreeMap<String, FieldStats> = field_ids
            .into_iter()
            .map(|id| (id.to_string(), FieldStats::default()))
            .collect();
        let mut sums: BTreeMap<String, f32> = BTreeMap::new();
        let (mut extracted, mut failed, mut cancelled) = (0, 0, 0);

        for doc in &documents {
            match &doc.outcome {
                DocumentOutcome::Extracted { result } => {
                    extracted += 1;
                    for (id, stats) in fields.iter_mut() {
                        match result.get(id) {
                            Some(winner) => {
                                let confidence = winner.confidence;
                                stats.found += 1;
                                *sums.entry(id.clone()).or_insert(0.0) += confidence;
                                stats.min_confidence = Some(
                                    stats.min_confidence.map_or(confidence, |m| m.min(confidence)),
                                );
                                stats.max_confidence = Some(
                                    stats.max_confidence.map_or(confidence, |m| m.max(confidence)),
                                );
                                *stats.by_provenance.entry(winner.provenance).or_insert(0) += 1;
                            }
                            None => stats.missing += 1,
                        }
                    }
                }
                DocumentOutcome::Failed { .. } => {
                    failed += 1;
                    for stats in fields.values_mut() {
                        stats.missing += 1;
                    }
                }
                DocumentOutcome::Cancelled => cancelled += 1,
            }
        }

        for (id, stats) in fields.iter_mut() {
            if stats.found > 0 {
                let sum = sums.get(id).copied().unwrap_or(0.0);
                stats.average_confidence = sum / stats.found as f32;
            }
        }

        Self {
            documents,
            fields,
            extracted,
            failed,
            cancelled,
        }
    }

    /// Whether the batch stopped early.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }

    /// Outcome for a document id.
    pub fn document(&self, id: &str) -> Option<&DocumentReport> {
        self.documents.iter().find(|d| d.document == id)
    }
}
