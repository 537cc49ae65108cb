//! Candidate aggregation and winner selection.

use std::collections::BTreeMap;

use crate::models::{Candidate, ExtractionResult};
use crate::schema::FieldSchema;

/// Pick one winner per field and keep every candidate for audit.
///
/// Candidates are ranked by [`Candidate::rank`]. Fields without any
/// candidate are listed as missing, in schema order.
pub fn aggregate(schema: &FieldSchema, candidates: Vec<Candidate>) -> ExtractionResult {
    let mut fields = BTreeMap::new();
    let mut missing = Vec::new();

    for def in schema.fields() {
        let winner = candidates
            .iter()
            .filter(|c| c.field == def.id)
            .min_by(|a, b| a.rank(b));
        match winner {
            Some(winner) => {
                fields.insert(def.id.clone(), winner.clone());
            }
            None => missing.push(def.id.clone()),
        }
    }

    ExtractionResult {
        fields,
        candidates,
        missing,
    }
}
