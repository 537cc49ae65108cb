//! Core library for multi-pass field extraction from document text.
//!
//! This crate provides:
//! - A data-driven field schema (aliases, regex patterns, validation rules)
//! - Four matching passes: direct patterns, contextual labels, table
//!   structure and fuzzy labels
//! - Per-type validation and normalization of extracted values
//! - Deterministic ranking of candidates into one winner per field
//! - Parallel batch processing with cancellation and per-document time bounds

pub mod batch;
pub mod error;
pub mod extract;
pub mod models;
pub mod rules;
pub mod schema;

pub use batch::{BatchRunner, CancellationToken, DocumentSource, NamedDocument};
pub use error::{DocumentError, FieldscanError, Result, SchemaError};
pub use extract::{ExtractionControl, Extractor, Pass};
pub use models::{
    BatchReport, Candidate, DocumentOutcome, DocumentReport, ExtractionConfig, ExtractionResult,
    FieldStatus, FieldscanConfig, Provenance, RawDocument,
};
pub use rules::{ValidationRules, Validator, ValueType};
pub use schema::{FieldDefinition, FieldSchema};
