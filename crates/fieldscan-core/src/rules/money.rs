//! Monetary amount parsing and normalization.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::CURRENCY_MARKERS;

/// Exclusive upper bound on accepted amounts.
const MAX_AMOUNT: i64 = 1_000_000_000;

/// Parse an amount written with currency markers and thousands separators.
///
/// Handles "Rs. 12,345.00", "INR 1,23,456/-", "₹ 500", "1.234,56" and bare
/// digits. The last separator is treated as the decimal point when it is
/// followed by one or two digits and occurs only once; every other
/// separator is a thousands separator.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let stripped = CURRENCY_MARKERS.replace_all(raw, "");
    let compact: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.trim_end_matches(['.', ',']);

    if compact.is_empty() || !compact.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !compact
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',' || c == '.')
    {
        return None;
    }

    let (integer, fraction) = match compact.rfind([',', '.']) {
        None => (compact, ""),
        Some(pos) => {
            let sep = compact.as_bytes()[pos] as char;
            let tail = &compact[pos + 1..];
            let sep_count = compact.matches(sep).count();
            if tail.len() <= 2 && sep_count == 1 {
                (&compact[..pos], tail)
            } else if tail.len() == 3 {
                // A dot after commas with three trailing digits is a third
                // decimal place, not a separator.
                if sep == '.' && compact[..pos].contains(',') {
                    return None;
                }
                (compact, "")
            } else {
                return None;
            }
        }
    };

    let mut digits: String = integer.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        digits.push('0');
    }
    let number = if fraction.is_empty() {
        digits
    } else {
        format!("{}.{}", digits, fraction)
    };

    let amount = Decimal::from_str(&number).ok()?;
    if amount <= Decimal::ZERO || amount >= Decimal::from(MAX_AMOUNT) {
        return None;
    }
    Some(amount)
}

/// Clean an amount to its canonical two-decimal form without separators.
pub fn clean_amount(raw: &str) -> Option<String> {
    parse_amount(raw).map(|amount| format!("{:.2}", amount))
}
