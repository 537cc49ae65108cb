//! The extraction engine: runs the passes in order and aggregates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{
    ContextualMatcher, DirectMatcher, DocumentView, FieldSet, FuzzyMatcher, Pass, PassContext,
    TableMatcher, aggregate,
};
use crate::batch::CancellationToken;
use crate::error::DocumentError;
use crate::models::{Candidate, ExtractionConfig, ExtractionResult, Provenance, RawDocument};
use crate::schema::FieldSchema;

/// Cancellation and time bound for one extraction.
#[derive(Debug, Clone)]
pub struct ExtractionControl {
    cancel: Option<CancellationToken>,
    started: Instant,
    timeout: Option<Duration>,
}

impl Default for ExtractionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionControl {
    /// No cancellation, no time bound. The clock starts now.
    pub fn new() -> Self {
        Self {
            cancel: None,
            started: Instant::now(),
            timeout: None,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fail if cancelled or past the time bound.
    pub fn checkpoint(&self) -> Result<(), DocumentError> {
        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(DocumentError::Cancelled);
        }
        if let Some(timeout) = self.timeout {
            let elapsed = self.started.elapsed();
            if elapsed > timeout {
                return Err(DocumentError::TimedOut {
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }
        }
        Ok(())
    }
}

/// Runs the enabled passes over a document and aggregates the candidates.
///
/// Cheap to share: the schema sits behind an [`Arc`] and passes hold no
/// per-document state.
pub struct Extractor {
    schema: Arc<FieldSchema>,
    config: ExtractionConfig,
    passes: Vec<Box<dyn Pass>>,
}

impl Extractor {
    pub fn new(schema: Arc<FieldSchema>, config: ExtractionConfig) -> Self {
        let mut passes: Vec<Box<dyn Pass>> =
            vec![Box::new(DirectMatcher), Box::new(ContextualMatcher)];
        if config.enable_table {
            passes.push(Box::new(TableMatcher));
        }
        if config.enable_fuzzy {
            passes.push(Box::new(FuzzyMatcher));
        }
        Self {
            schema,
            config,
            passes,
        }
    }

    pub fn schema(&self) -> &Arc<FieldSchema> {
        &self.schema
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Provenance of each enabled pass, in run order.
    pub fn passes(&self) -> impl Iterator<Item = Provenance> + '_ {
        self.passes.iter().map(|p| p.provenance())
    }

    /// Extract every field of the schema from a document.
    pub fn extract(&self, doc: &RawDocument) -> Result<ExtractionResult, DocumentError> {
        self.extract_with(doc, &ExtractionControl::new())
    }

    /// Extract with cancellation and a time bound, checked before each pass.
    pub fn extract_with(
        &self,
        doc: &RawDocument,
        control: &ExtractionControl,
    ) -> Result<ExtractionResult, DocumentError> {
        if doc.is_blank() {
            return Err(DocumentError::Empty);
        }

        let view = DocumentView::new(doc);
        debug!(
            "Indexed {} lines, {} pages, {} tables",
            view.line_count(),
            doc.page_count(),
            view.tables().len()
        );

        let mut candidates: Vec<Candidate> = Vec::new();
        for pass in &self.passes {
            control.checkpoint()?;

            let open = self.open_fields(pass.provenance(), &candidates);
            if open.is_empty() {
                debug!("Skipping {} pass: every field resolved", pass.name());
                continue;
            }

            let ctx = PassContext {
                view: &view,
                schema: &self.schema,
                open: &open,
                config: &self.config,
            };
            let found = pass.run(&ctx);
            debug!(
                "{} pass: {} open fields, {} candidates",
                pass.name(),
                open.len(),
                found.len()
            );
            candidates.extend(found.into_iter().map(|candidate| {
                let context = view.context(candidate.offset, candidate.raw.len());
                candidate.with_context(context)
            }));
        }

        let result = aggregate(&self.schema, candidates);
        debug!(
            "Resolved {}/{} fields",
            result.found_count(),
            self.schema.len()
        );
        Ok(result)
    }

    /// Fields a pass may still work on, given earlier candidates.
    ///
    /// The direct pass sees every field. The contextual and table passes
    /// skip fields that already hold a candidate at the resolved threshold.
    /// The fuzzy pass only sees fields with no candidate at all.
    fn open_fields(&self, provenance: Provenance, candidates: &[Candidate]) -> FieldSet {
        let mut open = FieldSet::all(self.schema.len());
        let threshold = match provenance {
            Provenance::Direct => return open,
            Provenance::Contextual | Provenance::Table => self.config.resolved_threshold,
            Provenance::Fuzzy => 0.0,
        };
        for candidate in candidates.iter().filter(|c| c.confidence >= threshold) {
            if let Some(idx) = self.schema.index_of(&candidate.field) {
                open.remove(idx);
            }
        }
        open
    }
}
