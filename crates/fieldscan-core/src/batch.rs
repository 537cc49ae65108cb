//! Batch processing across a worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{DocumentError, Result};
use crate::extract::{ExtractionControl, Extractor};
use crate::models::{BatchConfig, BatchReport, DocumentOutcome, DocumentReport, RawDocument};

/// Shared flag that stops a batch.
///
/// Cancelling keeps completed results; documents not yet finished are
/// reported as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Something that can produce a document's text.
pub trait DocumentSource: Send + Sync {
    /// Identifier used in reports (usually a path).
    fn id(&self) -> String;

    /// Acquire the document text.
    fn load(&self) -> std::result::Result<RawDocument, DocumentError>;
}

/// An already-loaded document.
#[derive(Debug, Clone)]
pub struct NamedDocument {
    pub id: String,
    pub document: RawDocument,
}

impl NamedDocument {
    pub fn new(id: impl Into<String>, document: RawDocument) -> Self {
        Self {
            id: id.into(),
            document,
        }
    }
}

impl DocumentSource for NamedDocument {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn load(&self) -> std::result::Result<RawDocument, DocumentError> {
        Ok(self.document.clone())
    }
}

/// Runs an [`Extractor`] over many documents, one document per task.
pub struct BatchRunner {
    extractor: Arc<Extractor>,
    jobs: usize,
    document_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(extractor: Arc<Extractor>, config: &BatchConfig) -> Self {
        Self {
            extractor,
            jobs: config.jobs,
            document_timeout: (config.document_timeout_ms > 0)
                .then(|| Duration::from_millis(config.document_timeout_ms)),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every source and build the batch report.
    pub fn run<S: DocumentSource>(&self, sources: &[S]) -> Result<BatchReport> {
        self.run_with_progress(sources, |_| {})
    }

    /// Process every source, calling `on_done` as each document finishes.
    ///
    /// Reports come back in input order whatever the completion order.
    pub fn run_with_progress<S, F>(&self, sources: &[S], on_done: F) -> Result<BatchReport>
    where
        S: DocumentSource,
        F: Fn(&DocumentReport) + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()?;

        info!(
            "Processing {} documents on {} workers",
            sources.len(),
            pool.current_num_threads()
        );

        let documents: Vec<DocumentReport> = pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    let report = self.process_one(source);
                    on_done(&report);
                    report
                })
                .collect()
        });

        let report = BatchReport::from_documents(self.extractor.schema().ids(), documents);
        info!(
            "Batch finished: {} extracted, {} failed, {} cancelled",
            report.extracted, report.failed, report.cancelled
        );
        Ok(report)
    }

    /// Load and extract one document. Failures stay inside the report.
    pub fn process_one<S: DocumentSource + ?Sized>(&self, source: &S) -> DocumentReport {
        let id = source.id();
        let start = Instant::now();

        let mut control = ExtractionControl::new().with_cancel(self.cancel.clone());
        if let Some(timeout) = self.document_timeout {
            control = control.with_timeout(timeout);
        }

        let result = control
            .checkpoint()
            .and_then(|_| source.load())
            .and_then(|doc| self.extractor.extract_with(&doc, &control));

        match &result {
            Ok(r) => debug!("{}: {} fields resolved", id, r.found_count()),
            Err(DocumentError::Cancelled) => debug!("{}: cancelled", id),
            Err(e) => warn!("{}: {}", id, e),
        }

        DocumentReport {
            document: id,
            outcome: DocumentOutcome::from_result(result),
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionConfig;
    use crate::schema::FieldSchema;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    struct Unreadable;

    impl DocumentSource for Unreadable {
        fn id(&self) -> String {
            "broken.pdf".to_string()
        }

        fn load(&self) -> std::result::Result<RawDocument, DocumentError> {
            Err(DocumentError::Unreadable("no text layer".to_string()))
        }
    }

    fn runner(jobs: usize) -> BatchRunner {
        let extractor = Extractor::new(
            Arc::new(FieldSchema::builtin().unwrap()),
            ExtractionConfig::default(),
        );
        BatchRunner::new(
            Arc::new(extractor),
            &BatchConfig {
                jobs,
                document_timeout_ms: 0,
            },
        )
    }

    fn docs() -> Vec<NamedDocument> {
        (0..12)
            .map(|i| {
                let text = if i % 4 == 3 {
                    String::new()
                } else {
                    format!("Policy No: POL{:05}\nGST: Rs. {},000.00", i, i + 1)
                };
                NamedDocument::new(format!("doc{:02}.txt", i), RawDocument::from_text(&text))
            })
            .collect()
    }

    #[test]
    fn test_results_in_input_order() {
        let report = runner(4).run(&docs()).unwrap();

        let ids: Vec<&str> = report.documents.iter().map(|d| d.document.as_str()).collect();
        let expected: Vec<String> = (0..12).map(|i| format!("doc{:02}.txt", i)).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());

        assert_eq!(report.extracted, 9);
        assert_eq!(report.failed, 3);
        assert_eq!(report.fields["policy_no"].found, 9);
        assert_eq!(report.fields["policy_no"].missing, 3);
        let first = report.documents[0].outcome.result().unwrap();
        assert_eq!(first.value("policy_no"), Some("POL00000"));
        assert_eq!(first.value("gst_amount"), Some("1000.00"));
    }

    #[test]
    fn test_worker_count_does_not_change_results() {
        let single = runner(1).run(&docs()).unwrap();
        let many = runner(6).run(&docs()).unwrap();

        let outcomes = |r: &BatchReport| {
            r.documents
                .iter()
                .map(|d| d.outcome.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(outcomes(&single), outcomes(&many));
        assert_eq!(single.fields, many.fields);
    }

    #[test]
    fn test_load_failure_is_isolated() {
        let runner = runner(2);
        let report = runner.process_one(&Unreadable);
        assert_eq!(
            report.outcome,
            DocumentOutcome::Failed {
                reason: "failed to load document: no text layer".to_string()
            }
        );
    }

    #[test]
    fn test_cancelled_batch_keeps_structure() {
        let runner = runner(2);
        runner.cancellation_token().cancel();

        let report = runner.run(&docs()).unwrap();
        assert_eq!(report.cancelled, 12);
        assert!(report.was_cancelled());
        assert_eq!(report.fields["policy_no"].found, 0);
        assert_eq!(report.fields["policy_no"].missing, 0);
    }

    #[test]
    fn test_progress_callback_sees_every_document() {
        let seen = AtomicUsize::new(0);
        runner(3)
            .run_with_progress(&docs(), |_| {
                seen.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 12);
    }
}
