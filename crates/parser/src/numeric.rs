//! Numeric grammar for integer and decimal targets.
//!
//! Only digit-based numerals count; spelled-out numbers ("forty two") are
//! not candidates. Thousands separators (`1,234`) and exponents are accepted.

use std::sync::LazyLock;

use llmbind_core::error::ParseError;
use llmbind_core::tool::fits_i64;
use regex_lite::Regex;

static NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d{1,3}(?:,\d{3})+|\d+)?(?:\.\d+)?(?:[eE][-+]?\d+)?").ok()
});

/// One numeric token found in text.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The token with separators removed
    pub literal: String,
    pub value: f64,
}

impl Candidate {
    fn is_integral_literal(&self) -> bool {
        !self.literal.contains(['.', 'e', 'E'])
    }
}

/// All numeric tokens in `text`, in order of appearance.
pub fn candidates(text: &str) -> Vec<Candidate> {
    let mut found = Vec::new();
    let Some(number) = NUMBER.as_ref() else {
        return found;
    };
    for m in number.find_iter(text) {
        let mut token = m.as_str();
        if !token.bytes().any(|b| b.is_ascii_digit()) {
            continue;
        }

        // "A-1" or "2024-05": a dash glued to a word is not a sign.
        if token.starts_with(['-', '+']) {
            let glued = text[..m.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
            if glued {
                token = &token[1..];
            }
        }

        let literal = token.replace(',', "");
        if let Ok(value) = literal.parse::<f64>() {
            if value.is_finite() {
                found.push(Candidate { literal, value });
            }
        }
    }
    found
}

/// Distinct values among the candidates must agree; "42 (forty-two, 42)" is
/// fine, "between 3 and 5" is ambiguous.
fn single_value<'a>(target: &str, text: &str, found: &'a [Candidate]) -> Result<&'a Candidate, ParseError> {
    let Some(first) = found.first() else {
        return Err(ParseError::new(target, format!("no number found in '{}'", text.trim())));
    };

    if let Some(other) = found.iter().find(|c| c.value != first.value) {
        return Err(ParseError::new(
            target,
            format!(
                "ambiguous: '{}' and '{}' both appear in the response",
                first.literal, other.literal
            ),
        ));
    }
    Ok(first)
}

pub fn parse_integer(text: &str) -> Result<i64, ParseError> {
    let found = candidates(text);
    let first = single_value("integer", text, &found)?;

    if first.is_integral_literal() {
        return first
            .literal
            .trim_start_matches('+')
            .parse::<i64>()
            .map_err(|e| ParseError::new("integer", format!("'{}': {e}", first.literal)));
    }

    if first.value.fract() != 0.0 {
        return Err(ParseError::new(
            "integer",
            format!("'{}' has a fractional part", first.literal),
        ));
    }
    if !fits_i64(first.value) {
        return Err(ParseError::new("integer", format!("'{}' is out of range", first.literal)));
    }
    Ok(first.value as i64)
}

pub fn parse_decimal(text: &str) -> Result<f64, ParseError> {
    let found = candidates(text);
    single_value("decimal", text, &found).map(|c| c.value)
}
