//! Input rules for the country term.

use crate::aggregate::error::AggregateError;

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 100;

/// Check a raw country term and return it trimmed.
///
/// "Letters" means any Unicode alphabetic character, not just ASCII, so names
/// such as "España" or "Türkiye" pass. Length is counted in characters, not
/// bytes.
pub fn validate_country(raw: Option<&str>) -> Result<&str, AggregateError> {
    let term = raw.map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(AggregateError::Validation(
            "Country query parameter is required".to_string(),
        ));
    }

    let len = term.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(AggregateError::Validation(format!(
            "Country name must be between {MIN_LEN} and {MAX_LEN} characters"
        )));
    }

    if !term
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-')
    {
        return Err(AggregateError::Validation(
            "Country name may only contain letters, spaces and hyphens".to_string(),
        ));
    }

    Ok(term)
}

/// Cache key for a validated term.
pub fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}
