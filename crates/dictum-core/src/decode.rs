//! Scalar decoders.
//!
//! A decoder turns one raw scalar into a typed [`Decoded`] value of a fixed
//! target type. Decoders are total: every rejection is a returned
//! [`DecodeError`], so the engine can treat all leaves uniformly. All
//! constraint configuration (lengths, bounds, patterns, formats) is fixed
//! when the decoder is built.

use crate::error::SchemaError;
use crate::value::{Decoded, Shape, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Why a decoder rejected a value
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: Shape },

    #[error("null value")]
    Null,

    #[error("empty value")]
    Empty,

    #[error("invalid {expected} value '{value}'")]
    InvalidFormat { expected: &'static str, value: String },

    #[error("value {value} is out of range {}", describe_range(.min, .max))]
    OutOfRange {
        min: Option<f64>,
        max: Option<f64>,
        value: String,
    },

    #[error("length {actual} is less than minimum {min}")]
    TooShort { min: usize, actual: usize },

    #[error("length {actual} exceeds maximum {max}")]
    TooLong { max: usize, actual: usize },

    #[error("value '{value}' does not match pattern: {pattern}")]
    PatternMismatch { pattern: String, value: String },

    #[error("value {value} is not one of the allowed values")]
    NotAllowed { value: String },

    #[error("{message}")]
    Custom { message: String },
}

impl DecodeError {
    pub fn type_mismatch(expected: &'static str, found: &Value) -> Self {
        DecodeError::TypeMismatch {
            expected,
            found: Shape::of(found),
        }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        DecodeError::Custom {
            message: message.into(),
        }
    }

    /// Short rule name, stable across releases.
    pub fn rule(&self) -> &'static str {
        match self {
            DecodeError::TypeMismatch { .. } => "type",
            DecodeError::Null => "null",
            DecodeError::Empty => "empty",
            DecodeError::InvalidFormat { .. } => "format",
            DecodeError::OutOfRange { .. } => "range",
            DecodeError::TooShort { .. } => "minLength",
            DecodeError::TooLong { .. } => "maxLength",
            DecodeError::PatternMismatch { .. } => "pattern",
            DecodeError::NotAllowed { .. } => "enum",
            DecodeError::Custom { .. } => "custom",
        }
    }
}

fn describe_range(min: &Option<f64>, max: &Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{}, {}]", min, max),
        (Some(min), None) => format!(">= {}", min),
        (None, Some(max)) => format!("<= {}", max),
        (None, None) => "(unbounded)".to_string(),
    }
}

/// Decodes raw scalars into one target type.
///
/// Implementations must be pure: the same raw value always yields the same
/// result, and decoding never touches shared mutable state. Schemas hold
/// decoders behind `Arc` and share them across threads.
pub trait ScalarDecoder: fmt::Debug + Send + Sync {
    /// Name of the target type, used in type mismatch reports.
    fn target(&self) -> &'static str;

    fn decode(&self, raw: &Value) -> Result<Decoded, DecodeError>;

    /// Inverse of `decode`, producing a raw value this decoder accepts.
    fn encode(&self, value: &Decoded) -> Value {
        value.to_raw()
    }

    /// Whether `raw` counts as an empty value, decoded as null at nullable
    /// nodes and rejected as `Empty` elsewhere.
    fn is_blank(&self, raw: &Value) -> bool {
        raw.as_str().is_some_and(|s| s.trim().is_empty())
    }
}

/// Bound a count of chars, elements or entries.
pub fn check_length(
    actual: usize,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), DecodeError> {
    if let Some(min) = min {
        if actual < min {
            return Err(DecodeError::TooShort { min, actual });
        }
    }
    if let Some(max) = max {
        if actual > max {
            return Err(DecodeError::TooLong { max, actual });
        }
    }
    Ok(())
}

fn check_range(
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
    shown: impl fmt::Display,
) -> Result<(), DecodeError> {
    let below = min.is_some_and(|min| value < min);
    let above = max.is_some_and(|max| value > max);
    if below || above {
        Err(DecodeError::OutOfRange {
            min,
            max,
            value: shown.to_string(),
        })
    } else {
        Ok(())
    }
}

/// 2^63, the first `f64` above every `i64`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// `check_range` for integers, compared exactly rather than through `f64`.
fn check_integer_range(value: i64, min: Option<f64>, max: Option<f64>) -> Result<(), DecodeError> {
    let below = min.is_some_and(|min| {
        let min = min.ceil();
        if min >= I64_LIMIT {
            true
        } else if min < -I64_LIMIT {
            false
        } else {
            value < min as i64
        }
    });
    let above = max.is_some_and(|max| {
        let max = max.floor();
        if max >= I64_LIMIT {
            false
        } else if max < -I64_LIMIT {
            true
        } else {
            value > max as i64
        }
    });
    if below || above {
        Err(DecodeError::OutOfRange {
            min,
            max,
            value: value.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Reject chrono format strings with unknown specifiers.
pub(crate) fn check_date_format(format: &str) -> Result<(), SchemaError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        Err(SchemaError::InvalidDateFormat(format.to_string()))
    } else {
        Ok(())
    }
}

/// Accepts strings, trimming surrounding whitespace unless disabled.
#[derive(Debug, Clone)]
pub struct StringDecoder {
    trim: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
}

impl StringDecoder {
    pub fn new() -> Self {
        Self {
            trim: true,
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }

    pub fn trimmed(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Bound the length in characters.
    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

impl Default for StringDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarDecoder for StringDecoder {
    fn target(&self) -> &'static str {
        "string"
    }

    fn is_blank(&self, raw: &Value) -> bool {
        match raw.as_str() {
            Some(s) if self.trim => s.trim().is_empty(),
            Some(s) => s.is_empty(),
            None => false,
        }
    }

    fn decode(&self, raw: &Value) -> Result<Decoded, DecodeError> {
        let s = raw
            .as_str()
            .ok_or_else(|| DecodeError::type_mismatch(self.target(), raw))?;
        let s = if self.trim { s.trim() } else { s };

        check_length(s.chars().count(), self.min_length, self.max_length)?;

        if let Some(re) = &self.pattern {
            if !re.is_match(s) {
                return Err(DecodeError::PatternMismatch {
                    pattern: re.as_str().to_string(),
                    value: s.to_string(),
                });
            }
        }

        Ok(Decoded::String(s.to_string()))
    }
}

/// Accepts integers and numeric strings as `i64`.
#[derive(Debug, Clone, Default)]
pub struct IntegerDecoder {
    min: Option<f64>,
    max: Option<f64>,
}

impl IntegerDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

impl ScalarDecoder for IntegerDecoder {
    fn target(&self) -> &'static str {
        "integer"
    }

    fn decode(&self, raw: &Value) -> Result<Decoded, DecodeError> {
        let value = match raw {
            Value::Number(n) => match n.as_i64() {
                Some(i) => i,
                None if n.is_u64() => {
                    return Err(DecodeError::OutOfRange {
                        min: self.min,
                        max: self.max.or(Some(i64::MAX as f64)),
                        value: n.to_string(),
                    })
                }
                None => {
                    return Err(DecodeError::InvalidFormat {
                        expected: self.target(),
                        value: n.to_string(),
                    })
                }
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| DecodeError::InvalidFormat {
                    expected: self.target(),
                    value: s.clone(),
                })?,
            other => return Err(DecodeError::type_mismatch(self.target(), other)),
        };

        check_integer_range(value, self.min, self.max)?;
        Ok(Decoded::Integer(value))
    }
}

/// Accepts any number or numeric string as `f64`.
#[derive(Debug, Clone, Default)]
pub struct NumberDecoder {
    min: Option<f64>,
    max: Option<f64>,
}

impl NumberDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

impl ScalarDecoder for NumberDecoder {
    fn target(&self) -> &'static str {
        "number"
    }

    fn decode(&self, raw: &Value) -> Result<Decoded, DecodeError> {
        let invalid = |value: String| DecodeError::InvalidFormat {
            expected: "number",
            value,
        };

        let value = match raw {
            Value::Number(n) => n.as_f64().ok_or_else(|| invalid(n.to_string()))?,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| invalid(s.clone()))?,
            other => return Err(DecodeError::type_mismatch(self.target(), other)),
        };

        check_range(value, self.min, self.max, value)?;
        Ok(Decoded::Float(value))
    }
}

const TRUE_VALUES: [&str; 5] = ["1", "true", "True", "t", "on"];
const FALSE_VALUES: [&str; 5] = ["0", "false", "False", "f", "off"];

/// Accepts booleans and the usual textual spellings of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanDecoder;

impl ScalarDecoder for BooleanDecoder {
    fn target(&self) -> &'static str {
        "boolean"
    }

    fn decode(&self, raw: &Value) -> Result<Decoded, DecodeError> {
        match raw {
            Value::Bool(b) => Ok(Decoded::Bool(*b)),
            Value::String(s) => {
                let s = s.trim();
                if TRUE_VALUES.contains(&s) {
                    Ok(Decoded::Bool(true))
                } else if FALSE_VALUES.contains(&s) {
                    Ok(Decoded::Bool(false))
                } else {
                    Err(DecodeError::InvalidFormat {
                        expected: self.target(),
                        value: s.to_string(),
                    })
                }
            }
            other => Err(DecodeError::type_mismatch(self.target(), other)),
        }
    }
}

/// Parses dates with a chrono format string.
#[derive(Debug, Clone)]
pub struct DateDecoder {
    format: String,
}

impl DateDecoder {
    pub fn new() -> Self {
        Self {
            format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn with_format(format: impl Into<String>) -> Result<Self, SchemaError> {
        let format = format.into();
        check_date_format(&format)?;
        Ok(Self { format })
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Default for DateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarDecoder for DateDecoder {
    fn target(&self) -> &'static str {
        "date"
    }

    fn decode(&self, raw: &Value) -> Result<Decoded, DecodeError> {
        let s = raw
            .as_str()
            .ok_or_else(|| DecodeError::type_mismatch(self.target(), raw))?;
        NaiveDate::parse_from_str(s.trim(), &self.format)
            .map(Decoded::Date)
            .map_err(|_| DecodeError::InvalidFormat {
                expected: self.target(),
                value: s.to_string(),
            })
    }

    fn encode(&self, value: &Decoded) -> Value {
        match value {
            Decoded::Date(d) => Value::String(d.format(&self.format).to_string()),
            other => other.to_raw(),
        }
    }
}

/// Parses timestamps without timezone with a chrono format string.
#[derive(Debug, Clone)]
pub struct DateTimeDecoder {
    format: String,
}

impl DateTimeDecoder {
    pub fn new() -> Self {
        Self {
            format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }

    pub fn with_format(format: impl Into<String>) -> Result<Self, SchemaError> {
        let format = format.into();
        check_date_format(&format)?;
        Ok(Self { format })
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Default for DateTimeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarDecoder for DateTimeDecoder {
    fn target(&self) -> &'static str {
        "datetime"
    }

    fn decode(&self, raw: &Value) -> Result<Decoded, DecodeError> {
        let s = raw
            .as_str()
            .ok_or_else(|| DecodeError::type_mismatch(self.target(), raw))?;
        NaiveDateTime::parse_from_str(s.trim(), &self.format)
            .map(Decoded::DateTime)
            .map_err(|_| DecodeError::InvalidFormat {
                expected: self.target(),
                value: s.to_string(),
            })
    }

    fn encode(&self, value: &Decoded) -> Value {
        match value {
            Decoded::DateTime(dt) => Value::String(dt.format(&self.format).to_string()),
            other => other.to_raw(),
        }
    }
}
