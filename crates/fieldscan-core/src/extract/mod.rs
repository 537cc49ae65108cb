//! The multi-pass extraction pipeline.
//!
//! Four independent matchers run over the same [`DocumentView`], each
//! producing validated candidates with its own confidence band. The
//! aggregator then picks one winner per field.

mod aggregate;
mod contextual;
mod direct;
mod engine;
mod fuzzy;
pub mod layout;
mod table;
mod view;

pub use aggregate::aggregate;
pub use contextual::ContextualMatcher;
pub use direct::DirectMatcher;
pub use engine::{ExtractionControl, Extractor};
pub use fuzzy::{FuzzyMatcher, is_label_hit};
pub use table::TableMatcher;
pub use view::DocumentView;

use crate::models::{Candidate, ExtractionConfig, Provenance};
use crate::schema::FieldSchema;

/// One matching strategy.
pub trait Pass: Send + Sync {
    /// Provenance stamped on every candidate of this pass.
    fn provenance(&self) -> Provenance;

    /// Produce candidates for the open fields of the context.
    fn run(&self, ctx: &PassContext<'_>) -> Vec<Candidate>;

    fn name(&self) -> &'static str {
        self.provenance().as_str()
    }
}

/// Everything a pass may read.
pub struct PassContext<'a> {
    pub view: &'a DocumentView<'a>,
    pub schema: &'a FieldSchema,
    /// Fields the pass may produce candidates for.
    pub open: &'a FieldSet,
    pub config: &'a ExtractionConfig,
}

/// A set of fields, by schema index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    members: Vec<bool>,
}

impl FieldSet {
    /// Every field of a schema with `len` fields.
    pub fn all(len: usize) -> Self {
        Self {
            members: vec![true; len],
        }
    }

    /// No field of a schema with `len` fields.
    pub fn none(len: usize) -> Self {
        Self {
            members: vec![false; len],
        }
    }

    pub fn contains(&self, field: usize) -> bool {
        self.members.get(field).copied().unwrap_or(false)
    }

    pub fn insert(&mut self, field: usize) {
        if let Some(slot) = self.members.get_mut(field) {
            *slot = true;
        }
    }

    pub fn remove(&mut self, field: usize) {
        if let Some(slot) = self.members.get_mut(field) {
            *slot = false;
        }
    }

    /// Member indices in schema order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter_map(|(idx, &member)| member.then_some(idx))
    }

    pub fn len(&self) -> usize {
        self.members.iter().filter(|m| **m).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.members.iter().any(|m| *m)
    }
}
