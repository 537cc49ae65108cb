//! Alphanumeric identifiers: policy, engine, chassis and cheque numbers.

use super::ValidationRules;
use super::patterns::{REPEATED_SEPARATORS, SEPARATOR_SPACING};

pub const DEFAULT_MIN_LEN: usize = 4;
pub const DEFAULT_MAX_LEN: usize = 30;

/// Clean a code to uppercase with tight separators.
pub fn clean_code(raw: &str, rules: &ValidationRules) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches(['.', ',', ':', ';']);
    let tight = SEPARATOR_SPACING.replace_all(trimmed, "$1");
    let collapsed = REPEATED_SEPARATORS.replace_all(&tight, "$1");
    let code = collapsed.trim_matches(['-', '/']).to_uppercase();

    if code.is_empty()
        || !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
    {
        return None;
    }

    let len = code.chars().count();
    let min = rules.min_len.unwrap_or(DEFAULT_MIN_LEN);
    let max = rules.max_len.unwrap_or(DEFAULT_MAX_LEN);
    if len < min || len > max {
        return None;
    }

    if rules.require_digit && !code.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    // Codes have no word structure; a reject term anywhere disqualifies.
    if rules
        .reject
        .iter()
        .any(|word| code.contains(&word.to_uppercase()))
    {
        return None;
    }

    Some(code)
}
