//! Common regex patterns for value shapes and cleaning.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Value shapes: tokens a field of the given type can look like. Used by
    // the contextual, table and fuzzy passes to pick a value near a label.
    pub static ref MONEY_SHAPE: Regex = Regex::new(
        r"(?i)(?:\b(?:rs|inr|usd|eur|gbp)\b\.?[ \t]*|[₹$€£][ \t]*)?\d(?:[\d,.]*\d)?"
    ).unwrap();

    pub static ref DATE_SHAPE: Regex = Regex::new(concat!(
        r"(?i)\b(?:",
        r"\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}",
        r"|\d{4}[/.\-]\d{1,2}[/.\-]\d{1,2}",
        r"|\d{1,2}(?:st|nd|rd|th)?[ \t\-/]+",
        r"(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?[ \t\-/]+\d{4}",
        r")\b",
    )).unwrap();

    pub static ref NAME_SHAPE: Regex = Regex::new(
        r"[A-Za-z][A-Za-z.,&'\-]*(?:[ \t][A-Za-z.,&'\-]+)*"
    ).unwrap();

    pub static ref CODE_SHAPE: Regex = Regex::new(
        r"\b[A-Za-z0-9][A-Za-z0-9/\-]{3,29}\b"
    ).unwrap();

    pub static ref TEXT_SHAPE: Regex = Regex::new(
        r"[A-Za-z0-9][A-Za-z0-9.,&'/\-]*(?:[ \t][A-Za-z0-9.,&'/\-]+)*"
    ).unwrap();

    // Currency markers stripped before parsing amounts (Rs. 1,000/-, INR 50, ₹ 20)
    pub static ref CURRENCY_MARKERS: Regex = Regex::new(
        r"(?i)\b(?:rs|inr|usd|eur|gbp)\b\.?|[₹$€£]|/-"
    ).unwrap();

    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    // Spaces around a hyphen or slash inside a code or date
    pub static ref SEPARATOR_SPACING: Regex = Regex::new(r"\s*([/\-])\s*").unwrap();

    pub static ref REPEATED_SEPARATORS: Regex = Regex::new(r"([/\-])[/\-]+").unwrap();

    // "5th May 2025" -> "5 May 2025"
    pub static ref ORDINAL_SUFFIX: Regex = Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap();

    // "Sept" is not a chrono month abbreviation
    pub static ref SEPT: Regex = Regex::new(r"(?i)\bsept\b").unwrap();

    // Two or more spaces, or any tab, separate columns
    pub static ref COLUMN_GAP: Regex = Regex::new(r"\t+| {2,}").unwrap();

    // Dashed / underlined row below a table header
    pub static ref SEPARATOR_ROW: Regex = Regex::new(r"^[\s|+:]*[-=_]{3,}[-=_\s|+:]*$").unwrap();
}

/// Collapse whitespace runs into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}
