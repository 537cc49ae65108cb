//! Free text and closed-vocabulary values.

use super::patterns::collapse_whitespace;
use super::{ValidationRules, contains_reject_word};

pub const DEFAULT_MIN_LEN: usize = 1;
pub const DEFAULT_MAX_LEN: usize = 120;

/// Clean a text value, mapping it onto the vocabulary when one is set.
pub fn clean_text(raw: &str, rules: &ValidationRules) -> Option<String> {
    let collapsed = collapse_whitespace(raw);
    let value = collapsed.trim_end_matches(|c: char| c.is_whitespace() || ",;:|".contains(c));

    let len = value.chars().count();
    let min = rules.min_len.unwrap_or(DEFAULT_MIN_LEN);
    let max = rules.max_len.unwrap_or(DEFAULT_MAX_LEN);
    if len < min || len > max {
        return None;
    }

    if contains_reject_word(value, &rules.reject) {
        return None;
    }

    if rules.vocabulary.is_empty() {
        return Some(value.to_string());
    }
    canonical_term(value, rules)
}

/// Map a value to its vocabulary entry.
///
/// Exact matches (entries or synonyms) win; otherwise the first entry, then
/// the first synonym, that occurs as whole words inside the value.
fn canonical_term(value: &str, rules: &ValidationRules) -> Option<String> {
    let lower = value.to_lowercase();

    if let Some(entry) = rules.vocabulary.iter().find(|v| v.to_lowercase() == lower) {
        return Some(entry.clone());
    }
    if let Some((_, entry)) = rules.synonyms.iter().find(|(k, _)| k.to_lowercase() == lower) {
        return Some(entry.clone());
    }

    let padded = format!(" {} ", words(&lower));
    let contains = |term: &str| padded.contains(&format!(" {} ", words(&term.to_lowercase())));

    if let Some(entry) = rules.vocabulary.iter().find(|v| contains(v)) {
        return Some(entry.clone());
    }
    rules
        .synonyms
        .iter()
        .find(|(k, _)| contains(k))
        .map(|(_, entry)| entry.clone())
}

// Letters and digits only, single-spaced.
fn words(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
