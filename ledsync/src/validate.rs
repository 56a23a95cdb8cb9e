//! Validation of candidate LED state coming from untrusted request bodies.
//!
//! Both fields arrive as raw JSON values. `color` must be a `#RRGGBB` string;
//! `count` goes through an explicit coercion step before the range check:
//!
//! - JSON integers are taken as-is
//! - JSON floats are accepted only when they hold an integral value
//! - strings of ASCII digits with an optional sign (surrounding whitespace
//!   allowed) are parsed
//!
//! Anything else (booleans, null, fractions, other strings, arrays, objects)
//! is rejected as not an integer.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Smallest accepted LED count.
pub const LED_MIN: u8 = 0;

/// Largest accepted LED count.
pub const LED_MAX: u8 = 8;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern is valid")
});

/// Reason a candidate write was rejected.
///
/// The `Display` text is the user-facing message returned by the API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid color — use #RRGGBB format")]
    InvalidColor,

    #[error("count must be an integer")]
    CountNotInteger,

    /// Worded in English like the other reasons; earlier deployments sent
    /// `count inválido — debe estar entre 0 y 8` for the same case.
    #[error("count out of range — must be between 0 and 8")]
    CountOutOfRange,
}

/// A color and count that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidWrite {
    pub color: String,
    pub count: u8,
}

/// Validate a candidate color and count.
///
/// The color is checked first, so a request with both fields wrong reports
/// the color.
pub fn validate(
    color: Option<&Value>,
    count: Option<&Value>,
) -> Result<ValidWrite, ValidationError> {
    let color = match color {
        Some(Value::String(s)) if is_hex_color(s) => s.clone(),
        _ => return Err(ValidationError::InvalidColor),
    };

    let count = coerce_count(count).ok_or(ValidationError::CountNotInteger)?;
    let count = u8::try_from(count)
        .ok()
        .filter(|c| (LED_MIN..=LED_MAX).contains(c))
        .ok_or(ValidationError::CountOutOfRange)?;

    Ok(ValidWrite { color, count })
}

/// Whether `s` is a `#RRGGBB` color (hex digits in either case).
pub fn is_hex_color(s: &str) -> bool {
    HEX_COLOR.is_match(s)
}

fn coerce_count(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if n.is_u64() {
                // Larger than i64::MAX; still an integer, just out of range.
                Some(i64::MAX)
            } else {
                let f = n.as_f64()?;
                // `as` saturates, which keeps huge values out of range.
                (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
            }
        }
        Value::String(s) => parse_integer_string(s),
        _ => None,
    }
}

fn parse_integer_string(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Overflowing digit strings are integers too, just absurdly large ones.
    match trimmed.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) if trimmed.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn check(color: Value, count: Value) -> Result<ValidWrite, ValidationError> {
        validate(Some(&color), Some(&count))
    }

    #[test_case("#00ff00" ; "lowercase")]
    #[test_case("#00FF00" ; "uppercase")]
    #[test_case("#aBcDeF" ; "mixed case")]
    #[test_case("#000000" ; "black")]
    fn test_accepts_hex_colors(color: &str) {
        let valid = check(json!(color), json!(3)).unwrap();
        assert_eq!(valid.color, color);
        assert_eq!(valid.count, 3);
    }

    #[test_case(json!("blue") ; "named color")]
    #[test_case(json!("00ff00") ; "missing hash")]
    #[test_case(json!("#00ff0") ; "too short")]
    #[test_case(json!("#00ff000") ; "too long")]
    #[test_case(json!("#00gg00") ; "non hex digit")]
    #[test_case(json!(" #00ff00") ; "leading space")]
    #[test_case(json!("#00ff00\n") ; "trailing newline")]
    #[test_case(json!(0x00ff00) ; "number")]
    #[test_case(Value::Null ; "null")]
    fn test_rejects_bad_colors(color: Value) {
        assert_eq!(check(color, json!(3)), Err(ValidationError::InvalidColor));
    }

    #[test]
    fn test_missing_color_is_invalid() {
        assert_eq!(
            validate(None, Some(&json!(1))),
            Err(ValidationError::InvalidColor)
        );
    }

    #[test]
    fn test_color_checked_before_count() {
        assert_eq!(
            check(json!("red"), json!("lots")),
            Err(ValidationError::InvalidColor)
        );
    }

    #[test_case(json!(0), 0 ; "min")]
    #[test_case(json!(8), 8 ; "max")]
    #[test_case(json!(4.0), 4 ; "integral float")]
    #[test_case(json!("5"), 5 ; "digit string")]
    #[test_case(json!(" 6 "), 6 ; "padded digit string")]
    #[test_case(json!("+2"), 2 ; "plus sign")]
    #[test_case(json!("-0"), 0 ; "negative zero string")]
    fn test_coerces_counts(count: Value, expected: u8) {
        assert_eq!(check(json!("#123456"), count).unwrap().count, expected);
    }

    #[test_case(json!(3.5) ; "fraction")]
    #[test_case(json!("3.0") ; "decimal string")]
    #[test_case(json!("three") ; "word")]
    #[test_case(json!("") ; "empty string")]
    #[test_case(json!(true) ; "boolean")]
    #[test_case(Value::Null ; "null")]
    #[test_case(json!([3]) ; "array")]
    #[test_case(json!({"n": 3}) ; "object")]
    fn test_rejects_non_integer_counts(count: Value) {
        assert_eq!(
            check(json!("#123456"), count),
            Err(ValidationError::CountNotInteger)
        );
    }

    #[test]
    fn test_missing_count_is_not_integer() {
        assert_eq!(
            validate(Some(&json!("#123456")), None),
            Err(ValidationError::CountNotInteger)
        );
    }

    #[test_case(json!(9) ; "just above")]
    #[test_case(json!(-1) ; "negative")]
    #[test_case(json!("-3") ; "negative string")]
    #[test_case(json!(1000) ; "large")]
    #[test_case(json!(u64::MAX) ; "u64 max")]
    #[test_case(json!("99999999999999999999999") ; "overflowing string")]
    fn test_rejects_out_of_range_counts(count: Value) {
        assert_eq!(
            check(json!("#123456"), count),
            Err(ValidationError::CountOutOfRange)
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ValidationError::InvalidColor.to_string(),
            "invalid color — use #RRGGBB format"
        );
        assert_eq!(
            ValidationError::CountNotInteger.to_string(),
            "count must be an integer"
        );
        assert_eq!(
            ValidationError::CountOutOfRange.to_string(),
            "count out of range — must be between 0 and 8"
        );
    }
}
