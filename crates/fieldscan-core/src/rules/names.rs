//! Person and organisation names.

use super::patterns::collapse_whitespace;
use super::{ValidationRules, contains_reject_word};

pub const DEFAULT_MIN_LEN: usize = 2;
pub const DEFAULT_MAX_LEN: usize = 60;

/// Clean a name: collapse whitespace, trim stray punctuation, title-case.
///
/// Rejects values that are not mostly alphabetic, fall outside the length
/// bounds or contain a reject word.
pub fn clean_name(raw: &str, rules: &ValidationRules) -> Option<String> {
    let collapsed = collapse_whitespace(raw);
    let trimmed = collapsed
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(|c: char| c.is_whitespace() || ",;:-|/&'".contains(c));

    let len = trimmed.chars().count();
    let min = rules.min_len.unwrap_or(DEFAULT_MIN_LEN);
    let max = rules.max_len.unwrap_or(DEFAULT_MAX_LEN);
    if len < min || len > max {
        return None;
    }

    let visible = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    let alphabetic = trimmed.chars().filter(|c| c.is_alphabetic()).count();
    if alphabetic * 2 <= visible {
        return None;
    }

    if contains_reject_word(trimmed, &rules.reject) {
        return None;
    }

    Some(title_case(trimmed))
}

/// Uppercase letters that follow a non-letter, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
