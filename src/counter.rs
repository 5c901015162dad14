//! Cleaning of the cumulative ENTRIES/EXITS fields.
//!
//! Exports pad counters with leading zeros and, in some weeks, stray spaces.

use crate::error::CounterError;

/// Drops every whitespace character, then the leading run of `0`.
///
/// An all-zero counter normalizes to the empty string.
pub fn normalize_counter(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact.trim_start_matches('0').to_string()
}

/// Parses a raw counter field into its integer value.
///
/// # Errors
///
/// Returns [`CounterError`] if anything other than decimal digits remains
/// after normalization.
pub fn parse_counter(raw: &str) -> Result<u64, CounterError> {
    let digits = normalize_counter(raw);
    if digits.is_empty() {
        return if raw.contains('0') {
            Ok(0)
        } else {
            Err(CounterError::NotNumeric(raw.to_string()))
        };
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CounterError::NotNumeric(raw.to_string()));
    }
    digits
        .parse()
        .map_err(|_| CounterError::Overflow(raw.to_string()))
}
