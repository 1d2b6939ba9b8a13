//! Dutch phone number validation and formatting
//!
//! Pure, deterministic helpers with no I/O. Numbers are validated against the
//! two national patterns (mobile `06`, geographic landline) after stripping
//! separators, and formatted into the canonical international form with the
//! trunk prefix rewritten to `+31`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Mobile numbers: trunk or country prefix followed by 6 and 8 digits.
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+31|0031|0)6\d{8}$").expect("valid mobile pattern"));

/// Landlines: trunk or country prefix followed by a 9-digit national number
/// whose first digit is a geographic area code (never 0 or 6).
static LANDLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+31|0031|0)[1-57-9]\d{8}$").expect("valid landline pattern"));

/// Result of validating a free-form phone string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneCheck {
    /// Whether the input matches a Dutch mobile or landline pattern
    pub is_valid: bool,

    /// Matched the mobile pattern
    pub is_mobile: bool,

    /// Matched the landline pattern
    pub is_landline: bool,

    /// Best-effort canonical `+31...` representation, computed even for
    /// invalid input
    pub formatted: String,
}

/// Strip whitespace and common separators from a raw phone string
fn strip_separators(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
        .collect()
}

/// Rewrite a raw phone string into the canonical `+31...` form
///
/// The national trunk prefix (`0`) and the `0031` dialing prefix are rewritten
/// to `+31`; a bare national number gets `+31` prepended. Re-formatting an
/// already-formatted number returns the same value.
pub fn format_dutch_number(input: &str) -> String {
    let cleaned = strip_separators(input);

    if let Some(rest) = cleaned.strip_prefix("0031") {
        format!("+31{}", rest)
    } else if cleaned.starts_with('+') {
        cleaned
    } else if let Some(rest) = cleaned.strip_prefix('0') {
        format!("+31{}", rest)
    } else {
        format!("+31{}", cleaned)
    }
}

/// Validate a free-form phone string against the Dutch national patterns
///
/// Never fails: invalid input yields `is_valid: false` with the best-effort
/// `formatted` value still computed from the raw digits.
pub fn check_dutch_number(input: &str) -> PhoneCheck {
    let cleaned = strip_separators(input);
    let is_mobile = MOBILE_RE.is_match(&cleaned);
    let is_landline = LANDLINE_RE.is_match(&cleaned);

    PhoneCheck {
        is_valid: is_mobile || is_landline,
        is_mobile,
        is_landline,
        formatted: format_dutch_number(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_number_with_trunk_prefix() {
        let check = check_dutch_number("0612345678");
        assert!(check.is_valid);
        assert!(check.is_mobile);
        assert!(!check.is_landline);
        assert_eq!(check.formatted, "+31612345678");
    }

    #[test]
    fn test_mobile_number_accepted_formats() {
        for input in ["0612345678", "0031612345678", "+31612345678", "06 1234 5678", "06-12345678"] {
            let check = check_dutch_number(input);
            assert!(check.is_valid, "expected {} to be valid", input);
            assert!(check.is_mobile);
            assert_eq!(check.formatted, "+31612345678");
        }
    }

    #[test]
    fn test_landline_number() {
        let check = check_dutch_number("0201234567");
        assert!(check.is_valid);
        assert!(check.is_landline);
        assert!(!check.is_mobile);
        assert_eq!(check.formatted, "+31201234567");
    }

    #[test]
    fn test_formatting_is_idempotent() {
        for input in ["0612345678", "0031612345678", "+31612345678", "0101234567"] {
            let once = format_dutch_number(input);
            assert_eq!(format_dutch_number(&once), once);
        }
    }

    #[test]
    fn test_invalid_input_still_formats() {
        let check = check_dutch_number("12345");
        assert!(!check.is_valid);
        assert!(!check.is_mobile);
        assert!(!check.is_landline);
        assert_eq!(check.formatted, "+3112345");
    }

    #[test]
    fn test_too_long_mobile_rejected() {
        let check = check_dutch_number("061234567890");
        assert!(!check.is_valid);
    }

    #[test]
    fn test_foreign_number_rejected() {
        let check = check_dutch_number("+49151123456");
        assert!(!check.is_valid);
    }
}
