//! Date parsing and normalization.

use chrono::{Datelike, NaiveDate};

use super::patterns::{ORDINAL_SUFFIX, SEPT, collapse_whitespace};

/// Output format for every cleaned date.
pub const CANONICAL_FORMAT: &str = "%d/%m/%Y";

/// Accepted input formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d-%B-%Y",
    "%d %B %Y",
    "%d %b, %Y",
    "%d/%b/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
];

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// Parse a date in any of the accepted formats.
///
/// Day-first readings win over month-first ones. Four-digit-year formats are
/// tried before two-digit ones; a two-digit year read as `%Y` falls outside
/// the accepted year range and moves on to the `%y` format.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = collapse_whitespace(raw);
    let text = text.trim_end_matches(['.', ',', ';']);
    let text = ORDINAL_SUFFIX.replace_all(text, "$1");
    let text = SEPT.replace_all(&text, "Sep");
    let text = text.replace(" - ", "-").replace(" / ", "/");

    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&text, fmt)
            .ok()
            .filter(|d| (MIN_YEAR..=MAX_YEAR).contains(&d.year()))
    })
}

/// Clean a date to `DD/MM/YYYY`.
pub fn clean_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format(CANONICAL_FORMAT).to_string())
}
