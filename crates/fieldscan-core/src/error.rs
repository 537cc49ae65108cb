//! Error types for the fieldscan-core library.

use thiserror::Error;

/// Main error type for the fieldscan library.
#[derive(Error, Debug)]
pub enum FieldscanError {
    /// Field schema could not be loaded.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A single document could not be extracted.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Worker pool could not be started.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Defects in the field schema configuration.
///
/// These are fatal at initialization: a schema that fails to load never
/// reaches document processing.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema document is not valid JSON for the expected shape.
    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    /// The schema defines no fields.
    #[error("schema defines no fields")]
    Empty,

    /// Two fields share an id.
    #[error("duplicate field id: {0}")]
    DuplicateField(String),

    /// A field has no aliases to anchor contextual matching.
    #[error("field {0} has no aliases")]
    NoAliases(String),

    /// A pattern failed to compile.
    #[error("invalid pattern #{index} for field {field}: {source}")]
    InvalidPattern {
        field: String,
        index: usize,
        #[source]
        source: regex::Error,
    },

    /// A value-shape override failed to compile.
    #[error("invalid value shape for field {field}: {source}")]
    InvalidShape {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// Validation rules are inconsistent.
    #[error("invalid rules for field {field}: {reason}")]
    InvalidRules { field: String, reason: String },
}

/// Per-document failures. A failing document never aborts a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The document has no non-blank lines.
    #[error("document contains no text")]
    Empty,

    /// The document source could not be read.
    #[error("failed to load document: {0}")]
    Unreadable(String),

    /// Processing was cancelled before completion.
    #[error("extraction cancelled")]
    Cancelled,

    /// The per-document time bound was exceeded.
    #[error("extraction exceeded time bound after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },
}

/// Result type for the fieldscan library.
pub type Result<T> = std::result::Result<T, FieldscanError>;
