//! Per-type validation and normalization of candidate values.

pub mod codes;
pub mod dates;
pub mod money;
pub mod names;
pub mod patterns;
pub mod text;

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Money,
    Date,
    Name,
    Code,
    Text,
}

impl ValueType {
    /// Built-in value shape used to pick a value token near a label.
    pub fn default_shape(self) -> &'static Regex {
        match self {
            ValueType::Money => &*patterns::MONEY_SHAPE,
            ValueType::Date => &*patterns::DATE_SHAPE,
            ValueType::Name => &*patterns::NAME_SHAPE,
            ValueType::Code => &*patterns::CODE_SHAPE,
            ValueType::Text => &*patterns::TEXT_SHAPE,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Money => "MONEY",
            ValueType::Date => "DATE",
            ValueType::Name => "NAME",
            ValueType::Code => "CODE",
            ValueType::Text => "TEXT",
        };
        f.pad(s)
    }
}

/// Per-field tuning of the validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Minimum length in characters (type default when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,

    /// Maximum length in characters (type default when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,

    /// Codes must contain at least one digit.
    pub require_digit: bool,

    /// Closed set of canonical text values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vocabulary: Vec<String>,

    /// Alternative spelling -> vocabulary entry.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub synonyms: BTreeMap<String, String>,

    /// Words that disqualify a value.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reject: Vec<String>,
}

impl ValidationRules {
    /// Check internal consistency. Returns a reason on failure.
    pub fn check(&self) -> std::result::Result<(), String> {
        if let (Some(min), Some(max)) = (self.min_len, self.max_len) {
            if min > max {
                return Err(format!("min_len {} exceeds max_len {}", min, max));
            }
        }
        if let Some((alias, entry)) = self
            .synonyms
            .iter()
            .find(|(_, entry)| !self.vocabulary.iter().any(|v| v == *entry))
        {
            return Err(format!(
                "synonym '{}' maps to '{}', which is not in the vocabulary",
                alias, entry
            ));
        }
        Ok(())
    }
}

/// Accepts or rejects a raw value and returns its canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct Validator {
    value_type: ValueType,
    rules: ValidationRules,
}

impl Validator {
    pub fn new(value_type: ValueType, rules: ValidationRules) -> Self {
        Self { value_type, rules }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Cleaned value, or `None` when the raw text is not acceptable.
    pub fn clean(&self, raw: &str) -> Option<String> {
        match self.value_type {
            ValueType::Money => money::clean_amount(raw),
            ValueType::Date => dates::clean_date(raw),
            ValueType::Name => names::clean_name(raw, &self.rules),
            ValueType::Code => codes::clean_code(raw, &self.rules),
            ValueType::Text => text::clean_text(raw, &self.rules),
        }
    }

    pub fn accepts(&self, raw: &str) -> bool {
        self.clean(raw).is_some()
    }
}

/// Whether any reject word occurs in `value` as a whole word, ignoring case.
pub(crate) fn contains_reject_word(value: &str, reject: &[String]) -> bool {
    if reject.is_empty() {
        return false;
    }
    let lower = value.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    reject
        .iter()
        .any(|r| words.iter().any(|w| *w == r.to_lowercase()))
}
