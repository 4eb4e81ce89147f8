//! Amount parsing for the textual money and quantity columns.
//!
//! Broker exports and hand-edited sheets mix currency symbols, thousands
//! separators, accounting-style parenthesised negatives and dash
//! placeholders. Both parsers accept all of these; they differ only in
//! what happens when the text is still not a number.

use crate::domain::error::AmountParseError;

/// Values that mean "no amount" and parse to zero.
const BLANK_SENTINELS: [&str; 4] = ["-", "", "$-", " $-"];

/// Characters removed before numeric parsing.
const STRIPPED_CHARS: [char; 4] = ['$', '€', '£', ','];

/// Parse an amount, returning an error when the text is not numeric.
pub fn try_parse_amount(value: &str) -> Result<f64, AmountParseError> {
    let trimmed = value.trim();
    if BLANK_SENTINELS.contains(&trimmed) {
        return Ok(0.0);
    }

    let cleaned: String = trimmed.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();
    let cleaned = cleaned.trim();

    let parsed = match cleaned
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => inner.trim().parse::<f64>().map(|v| -v),
        None => cleaned.parse::<f64>(),
    };

    parsed
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AmountParseError {
            value: value.to_string(),
        })
}

/// Parse an amount, coercing unparseable text to `0.0` with a warning.
pub fn parse_amount(value: &str) -> f64 {
    match try_parse_amount(value) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("{e}; treating as 0");
            0.0
        }
    }
}
