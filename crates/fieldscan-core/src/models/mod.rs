//! Data models shared by the extraction passes and their consumers.

pub mod candidate;
pub mod config;
pub mod document;
pub mod report;
pub mod result;

pub use candidate::{Candidate, Provenance};
pub use config::{BatchConfig, ExtractionConfig, FieldscanConfig, SchemaConfig};
pub use document::{DocumentLine, RawDocument, PAGE_BREAK};
pub use report::{BatchReport, DocumentOutcome, DocumentReport, FieldStats};
pub use result::{ExtractionResult, FieldStatus};
