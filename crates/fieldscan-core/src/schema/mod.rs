//! Field schema: the data-driven definition of every extractable field.

pub mod aliases;

pub use aliases::{AliasEntry, AliasHit, AliasIndex, normalize_label};

use std::collections::HashSet;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::models::{Candidate, Provenance};
use crate::rules::{ValidationRules, Validator, ValueType};

/// Built-in insurance document schema.
const BUILTIN_SCHEMA: &str = include_str!("../../schemas/insurance.json");

/// Serialized form of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub fields: Vec<FieldSpec>,
}

/// Serialized form of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    pub name: String,
    pub value_type: ValueType,
    pub aliases: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_shape: Option<String>,
    #[serde(default)]
    pub rules: ValidationRules,
}

/// A compiled regex bound to one field.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Position in the field's pattern list; 0 is the most specific.
    pub priority: usize,
    pub regex: Regex,
}

/// Immutable definition of one field.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub id: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub value_type: ValueType,
    pub patterns: Vec<Pattern>,
    shape: Regex,
    custom_shape: bool,
    validator: Validator,
}

impl FieldDefinition {
    fn from_spec(spec: FieldSpec) -> std::result::Result<Self, SchemaError> {
        if spec.aliases.iter().all(|a| a.trim().is_empty()) {
            return Err(SchemaError::NoAliases(spec.id));
        }
        spec.rules
            .check()
            .map_err(|reason| SchemaError::InvalidRules {
                field: spec.id.clone(),
                reason,
            })?;

        let mut patterns = Vec::with_capacity(spec.patterns.len());
        for (priority, source) in spec.patterns.iter().enumerate() {
            let regex = RegexBuilder::new(source)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .map_err(|e| SchemaError::InvalidPattern {
                    field: spec.id.clone(),
                    index: priority,
                    source: e,
                })?;
            patterns.push(Pattern { priority, regex });
        }

        let (shape, custom_shape) = match &spec.value_shape {
            Some(source) => {
                let regex = RegexBuilder::new(source)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| SchemaError::InvalidShape {
                        field: spec.id.clone(),
                        source: e,
                    })?;
                (regex, true)
            }
            None => (spec.value_type.default_shape().clone(), false),
        };

        Ok(Self {
            validator: Validator::new(spec.value_type, spec.rules),
            id: spec.id,
            name: spec.name,
            aliases: spec.aliases,
            value_type: spec.value_type,
            patterns,
            shape,
            custom_shape,
        })
    }

    /// Regex a value token of this field looks like.
    pub fn shape(&self) -> &Regex {
        &self.shape
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Validate `raw` and wrap it as a candidate of this field.
    ///
    /// Returns `None` when the validator rejects the text. This is the only
    /// place passes turn text into candidates.
    pub fn candidate(
        &self,
        raw: &str,
        confidence: f32,
        provenance: Provenance,
        page: u32,
        offset: usize,
    ) -> Option<Candidate> {
        let value = self.validator.clean(raw)?;
        let (low, high) = provenance.confidence_range();
        Some(Candidate {
            field: self.id.clone(),
            raw: raw.trim().to_string(),
            value,
            confidence: confidence.clamp(low, high),
            provenance,
            page,
            offset,
            label: None,
            pattern: None,
            context: String::new(),
        })
    }

    /// First value-shaped token in `text` that passes validation.
    ///
    /// A match must cover whole tokens: a shape match that starts or ends
    /// inside an alphanumeric run ("ABC" out of "ABC12345") is skipped.
    /// Returns the token's byte offset in `text`, the raw token and the
    /// cleaned value.
    pub fn first_value<'t>(&self, text: &'t str) -> Option<(usize, &'t str, String)> {
        self.shape
            .find_iter(text)
            .filter(|m| is_whole_token(text, m.start(), m.end()))
            .find_map(|m| {
                self.validator
                    .clean(m.as_str())
                    .map(|value| (m.start(), m.as_str(), value))
            })
    }

    /// Serializable form, for display and export.
    pub fn to_spec(&self) -> FieldSpec {
        FieldSpec {
            id: self.id.clone(),
            name: self.name.clone(),
            value_type: self.value_type,
            aliases: self.aliases.clone(),
            patterns: self
                .patterns
                .iter()
                .map(|p| p.regex.as_str().to_string())
                .collect(),
            value_shape: self
                .custom_shape
                .then(|| self.shape.as_str().to_string()),
            rules: self.validator.rules().clone(),
        }
    }
}

// No alphanumeric character directly before `start` or after `end`.
fn is_whole_token(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// The full set of field definitions plus the alias index.
///
/// Read-only after construction and shared across workers.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    fields: Vec<FieldDefinition>,
    aliases: AliasIndex,
}

impl FieldSchema {
    /// The built-in insurance schema.
    pub fn builtin() -> std::result::Result<Self, SchemaError> {
        Self::from_json(BUILTIN_SCHEMA)
    }

    /// Parse and compile a schema from JSON.
    pub fn from_json(json: &str) -> std::result::Result<Self, SchemaError> {
        let spec: SchemaSpec = serde_json::from_str(json)?;
        Self::from_spec(spec)
    }

    /// Load a schema from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let schema = Self::from_json(&content)?;
        debug!("Loaded schema with {} fields from {}", schema.len(), path.display());
        Ok(schema)
    }

    /// Compile a schema, validating it as a whole.
    pub fn from_spec(spec: SchemaSpec) -> std::result::Result<Self, SchemaError> {
        if spec.fields.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::new();
        for field in &spec.fields {
            if !seen.insert(field.id.as_str()) {
                return Err(SchemaError::DuplicateField(field.id.clone()));
            }
        }

        let fields = spec
            .fields
            .into_iter()
            .map(FieldDefinition::from_spec)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let aliases = AliasIndex::build(
            fields
                .iter()
                .enumerate()
                .map(|(idx, f)| (idx, f.aliases.iter().map(String::as_str))),
        );

        Ok(Self { fields, aliases })
    }

    /// Definition of a field by id.
    pub fn lookup(&self, field_id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    /// Position of a field in schema order.
    pub fn index_of(&self, field_id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == field_id)
    }

    pub fn field(&self, index: usize) -> &FieldDefinition {
        &self.fields[index]
    }

    /// Fields in schema order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Field ids in schema order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.id.as_str())
    }

    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_spec(&self) -> SchemaSpec {
        SchemaSpec {
            fields: self.fields.iter().map(FieldDefinition::to_spec).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_schema() {
        let schema = FieldSchema::builtin().unwrap();
        assert_eq!(schema.len(), 15);
        assert_eq!(schema.ids().next(), Some("policy_no"));

        let policy = schema.lookup("policy_no").unwrap();
        assert_eq!(policy.value_type, ValueType::Code);
        assert!(!policy.patterns.is_empty());
        assert!(schema.lookup("missing_field").is_none());
    }

    #[test]
    fn test_candidate_validates() {
        let schema = FieldSchema::builtin().unwrap();
        let premium = schema.lookup("total_premium").unwrap();

        let c = premium
            .candidate("Rs. 12,345.00", 0.95, Provenance::Direct, 1, 10)
            .unwrap();
        assert_eq!(c.value, "12345.00");
        assert_eq!(c.raw, "Rs. 12,345.00");
        assert!(premium.candidate("N/A", 0.95, Provenance::Direct, 1, 0).is_none());
    }

    #[test]
    fn test_candidate_confidence_clamped_to_tier() {
        let schema = FieldSchema::builtin().unwrap();
        let policy = schema.lookup("policy_no").unwrap();
        let c = policy
            .candidate("ABC12345", 0.95, Provenance::Table, 1, 0)
            .unwrap();
        assert_eq!(c.confidence, 0.79);
    }

    #[test]
    fn test_first_value_skips_invalid_tokens() {
        let schema = FieldSchema::builtin().unwrap();
        let policy = schema.lookup("policy_no").unwrap();
        let (offset, raw, value) = policy.first_value("Number ABC-98765 issued").unwrap();
        assert_eq!(offset, 7);
        assert_eq!(raw, "ABC-98765");
        assert_eq!(value, "ABC-98765");
    }

    #[test]
    fn test_first_value_needs_whole_tokens() {
        let schema = FieldSchema::builtin().unwrap();
        let insured = schema.lookup("insured_name").unwrap();

        assert_eq!(insured.first_value("ABC12345"), None);
        assert_eq!(insured.first_value("2nd Floor"), None);
        let (offset, raw, value) = insured.first_value("ABC123 John Doe").unwrap();
        assert_eq!((offset, raw), (7, "John Doe"));
        assert_eq!(value, "John Doe");

        let premium = schema.lookup("total_premium").unwrap();
        assert_eq!(premium.first_value("MA3EXA 1,200.00").unwrap().1, "1,200.00");
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = r#"{"fields": [
            {"id": "a", "name": "A", "value_type": "code", "aliases": ["a no"]},
            {"id": "a", "name": "A2", "value_type": "code", "aliases": ["a ref"]}
        ]}"#;
        assert!(matches!(
            FieldSchema::from_json(json),
            Err(SchemaError::DuplicateField(id)) if id == "a"
        ));
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let json = r#"{"fields": [
            {"id": "a", "name": "A", "value_type": "code", "aliases": ["a no"],
             "patterns": ["a no: (["]}
        ]}"#;
        assert!(matches!(
            FieldSchema::from_json(json),
            Err(SchemaError::InvalidPattern { index: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_empty_schema_and_aliases() {
        assert!(matches!(
            FieldSchema::from_json(r#"{"fields": []}"#),
            Err(SchemaError::Empty)
        ));
        let json = r#"{"fields": [{"id": "a", "name": "A", "value_type": "text", "aliases": []}]}"#;
        assert!(matches!(
            FieldSchema::from_json(json),
            Err(SchemaError::NoAliases(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            FieldSchema::from_json("{not json"),
            Err(SchemaError::Parse(_))
        ));
    }

    #[test]
    fn test_spec_round_trip_preserves_fields() {
        let schema = FieldSchema::builtin().unwrap();
        let json = serde_json::to_string(&schema.to_spec()).unwrap();
        let reloaded = FieldSchema::from_json(&json).unwrap();
        assert_eq!(reloaded.to_spec(), schema.to_spec());
    }
}
