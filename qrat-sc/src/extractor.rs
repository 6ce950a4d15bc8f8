//! Student number extraction from decoded QR text
//!
//! Printed badges in circulation use several payload shapes, so extraction
//! tries these rules in priority order and stops at the first that applies:
//!
//! 1. Marker prefix: `student:42`, `학생:42`, then `number:42`, `번호:42`
//! 2. Bare digits: `42`
//! 3. JSON object with `number`, `studentNumber` or `id`
//! 4. First run of digits anywhere in non-JSON text
//!
//! Extraction is pure; it never touches scan state.

use std::fmt;
use std::num::NonZeroU64;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

static STUDENT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:student:|학생:)([0-9]+)").expect("valid regex"));
static NUMBER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:number:|번호:)([0-9]+)").expect("valid regex"));
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// JSON fields that may carry the student number, in lookup order
const JSON_FIELDS: &[&str] = &["number", "studentNumber", "id"];

/// Positive student number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(NonZeroU64);

impl Identifier {
    /// `None` for zero
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn value(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a payload did not yield a student number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Marker without digits, or no digits anywhere
    #[error("no student number found in QR code")]
    NoNumberFound,

    /// Valid JSON without a recognized field
    #[error("unsupported QR code format")]
    UnsupportedFormat,

    /// Zero, negative, non-numeric or out-of-range value
    #[error("invalid student number")]
    InvalidNumber,
}

impl ExtractionError {
    /// Stable reason tag
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractionError::NoNumberFound => "no-number-found",
            ExtractionError::UnsupportedFormat => "unsupported-format",
            ExtractionError::InvalidNumber => "invalid-number",
        }
    }
}

/// Extract the student number from decoded QR text
pub fn extract_identifier(raw: &str) -> Result<Identifier, ExtractionError> {
    let lowered = raw.to_lowercase();

    for (markers, pattern) in [
        (["student:", "학생:"], &*STUDENT_MARKER),
        (["number:", "번호:"], &*NUMBER_MARKER),
    ] {
        if markers.iter().any(|m| lowered.contains(m)) {
            let digits = pattern
                .captures(raw)
                .and_then(|c| c.get(1))
                .ok_or(ExtractionError::NoNumberFound)?;
            return parse_digits(digits.as_str());
        }
    }

    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return parse_digits(trimmed);
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => from_json(&value),
        Err(_) => DIGIT_RUN
            .find(raw)
            .ok_or(ExtractionError::NoNumberFound)
            .and_then(|m| parse_digits(m.as_str())),
    }
}

fn parse_digits(digits: &str) -> Result<Identifier, ExtractionError> {
    digits
        .parse::<u64>()
        .ok()
        .and_then(Identifier::new)
        .ok_or(ExtractionError::InvalidNumber)
}

fn from_json(value: &Value) -> Result<Identifier, ExtractionError> {
    let field = JSON_FIELDS
        .iter()
        .filter_map(|name| value.get(name))
        .find(|v| is_truthy(v))
        .ok_or(ExtractionError::UnsupportedFormat)?;

    let number = match field {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0 && *f < u64::MAX as f64).map(|f| f.trunc() as u64)),
        Value::String(s) => leading_integer(s),
        _ => None,
    };

    number
        .and_then(Identifier::new)
        .ok_or(ExtractionError::InvalidNumber)
}

/// Empty strings, zero, `false` and `null` do not count as present
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Digits at the start of a string after optional whitespace, e.g. `" 17abc"` → 17.
/// A leading minus sign makes the value non-positive.
fn leading_integer(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let s = match s.strip_prefix('+') {
        Some(rest) => rest,
        None if s.starts_with('-') => return None,
        None => s,
    };
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    s[..end].parse().ok()
}
