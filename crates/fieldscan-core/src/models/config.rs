//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FieldscanError, Result};

/// Main configuration for fieldscan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldscanConfig {
    /// Pass thresholds and switches.
    pub extraction: ExtractionConfig,

    /// Batch worker configuration.
    pub batch: BatchConfig,

    /// Field schema location.
    pub schema: SchemaConfig,
}

/// Extraction engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Confidence at which a field counts as resolved for the cost-bounding
    /// skips of the contextual and table passes.
    pub resolved_threshold: f32,

    /// Lines searched below a label by the contextual pass.
    pub context_lookahead: usize,

    /// Run the table structure pass.
    pub enable_table: bool,

    /// Run the fuzzy label pass.
    pub enable_fuzzy: bool,

    /// Minimum label similarity (inclusive) for a fuzzy hit.
    pub fuzzy_threshold: f32,

    /// Maximum label length, in characters, considered by the fuzzy pass.
    pub fuzzy_label_max_len: usize,

    /// Lines searched below a fuzzy label.
    pub fuzzy_lookahead: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            resolved_threshold: 0.90,
            context_lookahead: 3,
            enable_table: true,
            enable_fuzzy: true,
            fuzzy_threshold: 0.70,
            fuzzy_label_max_len: 40,
            fuzzy_lookahead: 1,
        }
    }
}

impl ExtractionConfig {
    /// Check that thresholds are within their meaningful ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.resolved_threshold) {
            return Err(FieldscanError::Config(format!(
                "resolved_threshold must be within 0..=1, got {}",
                self.resolved_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(FieldscanError::Config(format!(
                "fuzzy_threshold must be within 0..=1, got {}",
                self.fuzzy_threshold
            )));
        }
        if self.fuzzy_label_max_len == 0 {
            return Err(FieldscanError::Config(
                "fuzzy_label_max_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of worker threads (0 = one per CPU).
    pub jobs: usize,

    /// Per-document time bound in milliseconds (0 = unbounded).
    pub document_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            document_timeout_ms: 0,
        }
    }
}

/// Field schema configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// JSON schema file; the built-in insurance schema is used when unset.
    pub path: Option<PathBuf>,
}

impl FieldscanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.extraction.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
