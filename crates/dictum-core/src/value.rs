//! Decoded values and the runtime shapes of raw input

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use indexmap::IndexMap;
use std::fmt;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A typed value produced by a successful decode.
///
/// Scalars carry their target type; containers mirror the structure of
/// the input they were decoded from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Decoded {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Sequence(Vec<Decoded>),
    /// Entries in visitation order
    Mapping(IndexMap<String, Decoded>),
}

impl Decoded {
    pub fn is_null(&self) -> bool {
        matches!(self, Decoded::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Decoded::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Decoded::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Decoded::Integer(i) => Some(*i as f64),
            Decoded::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Decoded::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Decoded]> {
        match self {
            Decoded::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Decoded>> {
        match self {
            Decoded::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a mapping entry by key.
    pub fn get(&self, key: &str) -> Option<&Decoded> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Convert back into an untyped value using the default formats.
    ///
    /// Schema-aware encoding (custom date formats) lives on `Schema::encode`.
    pub fn to_raw(&self) -> Value {
        match self {
            Decoded::Null => Value::Null,
            Decoded::Bool(b) => Value::Bool(*b),
            Decoded::Integer(i) => Value::from(*i),
            Decoded::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Decoded::String(s) => Value::String(s.clone()),
            Decoded::Date(d) => Value::String(d.format(DEFAULT_DATE_FORMAT).to_string()),
            Decoded::DateTime(dt) => {
                Value::String(dt.format(DEFAULT_DATETIME_FORMAT).to_string())
            }
            Decoded::Sequence(items) => Value::Array(items.iter().map(Decoded::to_raw).collect()),
            Decoded::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_raw()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Decoded {
    fn from(s: &str) -> Self {
        Decoded::String(s.to_string())
    }
}

impl From<String> for Decoded {
    fn from(s: String) -> Self {
        Decoded::String(s)
    }
}

impl From<i64> for Decoded {
    fn from(i: i64) -> Self {
        Decoded::Integer(i)
    }
}

impl From<bool> for Decoded {
    fn from(b: bool) -> Self {
        Decoded::Bool(b)
    }
}

impl<T: Into<Decoded>> From<Vec<T>> for Decoded {
    fn from(items: Vec<T>) -> Self {
        Decoded::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Runtime shape of a raw input value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Sequence,
    Mapping,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(_) => Shape::Bool,
            Value::Number(n) if n.is_f64() => Shape::Float,
            Value::Number(_) => Shape::Integer,
            Value::String(_) => Shape::String,
            Value::Array(_) => Shape::Sequence,
            Value::Object(_) => Shape::Mapping,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Null => "null",
            Shape::Bool => "boolean",
            Shape::Integer => "integer",
            Shape::Float => "float",
            Shape::String => "string",
            Shape::Sequence => "sequence",
            Shape::Mapping => "mapping",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shape_of_raw_values() {
        assert_eq!(Shape::of(&json!(null)), Shape::Null);
        assert_eq!(Shape::of(&json!(3)), Shape::Integer);
        assert_eq!(Shape::of(&json!(3.5)), Shape::Float);
        assert_eq!(Shape::of(&json!("3")), Shape::String);
        assert_eq!(Shape::of(&json!([])), Shape::Sequence);
        assert_eq!(Shape::of(&json!({})), Shape::Mapping);
    }

    #[test]
    fn test_to_raw_preserves_structure() {
        let mut entries = IndexMap::new();
        entries.insert("foo".to_string(), Decoded::from("Some text"));
        entries.insert("bar".to_string(), Decoded::from(vec![1i64, 2, 3]));
        let decoded = Decoded::Mapping(entries);

        assert_eq!(
            decoded.to_raw(),
            json!({"bar": [1, 2, 3], "foo": "Some text"})
        );
    }

    #[test]
    fn test_dates_use_default_formats() {
        let date = NaiveDate::from_ymd_opt(2015, 3, 1).unwrap();
        assert_eq!(Decoded::Date(date).to_raw(), json!("2015-03-01"));

        let dt = date.and_hms_opt(12, 30, 0).unwrap();
        assert_eq!(Decoded::DateTime(dt).to_raw(), json!("2015-03-01T12:30:00"));
    }

    #[test]
    fn test_serializes_untagged() {
        let decoded = Decoded::from(vec!["a", "b"]);
        assert_eq!(serde_json::to_value(&decoded).unwrap(), json!(["a", "b"]));
        assert_eq!(serde_json::to_value(Decoded::Null).unwrap(), json!(null));
    }
}
