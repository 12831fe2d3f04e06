//! Validation failure types for dictum-runtime.
//!
//! Every failure is a value attached to the instance node where it was
//! found; nothing here is ever raised past `validate`. [`ValidationError`]
//! pairs a failure with the [`Path`] of its node for flat reporting.

use crate::path::{Path, Segment};
use dictum_core::{DecodeError, Shape};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a single instance node is invalid.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Failure {
    /// The input's runtime shape does not fit the node kind.
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: Shape },

    /// A decoder or a length/value constraint rejected the input.
    #[error("{0}")]
    Decode(DecodeError),

    #[error("required field is missing")]
    MissingField,

    /// Only reported for strict mappings.
    #[error("unexpected field")]
    UnexpectedField,

    /// Decoded locally, but some child is invalid.
    #[error("contains invalid children")]
    Aggregate,
}

impl Failure {
    /// Short rule name
    pub fn rule(&self) -> &'static str {
        match self {
            Failure::TypeMismatch { .. } => "type",
            Failure::Decode(error) => error.rule(),
            Failure::MissingField => "required",
            Failure::UnexpectedField => "unexpected",
            Failure::Aggregate => "aggregate",
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Failure::Aggregate)
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Failure::Decode(_))
    }
}

impl From<DecodeError> for Failure {
    fn from(error: DecodeError) -> Self {
        match error {
            DecodeError::TypeMismatch { expected, found } => {
                Failure::TypeMismatch { expected, found }
            }
            other => Failure::Decode(other),
        }
    }
}

/// A collection of validation errors.
///
/// A validation run never stops at the first failure, so a report holds
/// every located failure of the run in visitation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    /// Individual validation errors
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create an empty validation errors collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the collection.
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if there are any errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Errors located exactly at `path`.
    pub fn at<'e>(&'e self, path: &'e Path) -> impl Iterator<Item = &'e ValidationError> + 'e {
        self.errors.iter().filter(move |e| &e.path == path)
    }

    /// Prefix all error paths with a given path segment.
    ///
    /// Used when a validated value is embedded under a parent.
    pub fn with_path_prefix(mut self, prefix: impl Into<Segment>) -> Self {
        let prefix = prefix.into();
        for error in &mut self.errors {
            error.path = std::mem::take(&mut error.path).prefixed(prefix.clone());
        }
        self
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "No validation errors")
        } else if self.errors.len() == 1 {
            write!(f, "Validation error: {}", self.errors[0])
        } else {
            writeln!(f, "{} validation errors:", self.errors.len())?;
            for (i, error) in self.errors.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, error)?;
            }
            Ok(())
        }
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// A single located failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Location of the failing node.
    ///
    /// Examples:
    /// - `[]` - root value
    /// - `["foo"]` - the foo field
    /// - `["bar", 1]` - second element of the bar sequence
    pub path: Path,

    /// What went wrong at that node.
    pub failure: Failure,
}

impl ValidationError {
    pub fn new(path: Path, failure: Failure) -> Self {
        Self { path, failure }
    }

    pub fn rule(&self) -> &'static str {
        self.failure.rule()
    }

    /// Human-readable error message.
    pub fn message(&self) -> String {
        self.failure.to_string()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.failure)?;
        } else {
            write!(f, "{}: {}", self.path, self.failure)?;
        }
        write!(f, " [{}]", self.rule())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_validation_error_display() {
        let error = ValidationError::new(
            path!["server", "workers"],
            Failure::Decode(DecodeError::OutOfRange {
                min: Some(1.0),
                max: None,
                value: "-1".to_string(),
            }),
        );

        let display = error.to_string();
        assert!(display.contains("server.workers"));
        assert!(display.contains("out of range"));
        assert!(display.contains("[range]"));
    }

    #[test]
    fn test_root_error_display_omits_path() {
        let error = ValidationError::new(
            Path::root(),
            Failure::TypeMismatch {
                expected: "mapping",
                found: Shape::Sequence,
            },
        );
        assert_eq!(error.to_string(), "expected mapping, found sequence [type]");
    }

    #[test]
    fn test_validation_errors_path_prefix() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::new(path!["name"], Failure::MissingField));
        errors.push(ValidationError::new(path!["labels", 0], Failure::UnexpectedField));

        let prefixed = errors.with_path_prefix("metadata");

        assert_eq!(prefixed.errors[0].path.to_string(), "metadata.name");
        assert_eq!(prefixed.errors[1].path.to_string(), "metadata.labels[0]");
    }

    #[test]
    fn test_errors_at_path() {
        let errors: ValidationErrors = vec![
            ValidationError::new(path!["bar", 1], Failure::Decode(DecodeError::Empty)),
            ValidationError::new(path!["foo"], Failure::MissingField),
            ValidationError::new(path!["bar", 1], Failure::UnexpectedField),
        ]
        .into_iter()
        .collect();

        let at_bar: Vec<_> = errors.at(&path!["bar", 1]).map(ValidationError::rule).collect();
        assert_eq!(at_bar, vec!["empty", "unexpected"]);
        assert_eq!(errors.at(&path!["bar"]).count(), 0);
        assert_eq!(errors.at(&Path::root()).count(), 0);

        let single = ValidationErrors::from(ValidationError::new(path!["foo"], Failure::MissingField));
        assert_eq!(single.len(), 1);
        assert_eq!(single.at(&path!["foo"]).count(), 1);
    }

    #[test]
    fn test_decoder_type_mismatch_becomes_type_failure() {
        let failure = Failure::from(DecodeError::TypeMismatch {
            expected: "integer",
            found: Shape::Bool,
        });
        assert_eq!(failure.rule(), "type");
        assert!(!failure.is_decode());

        let failure = Failure::from(DecodeError::Empty);
        assert!(failure.is_decode());
        assert_eq!(failure.rule(), "empty");
    }

    #[test]
    fn test_failure_serialization() {
        assert_eq!(
            serde_json::to_value(Failure::MissingField).unwrap(),
            json!({"kind": "missing_field"})
        );
        assert_eq!(
            serde_json::to_value(Failure::Decode(DecodeError::Empty)).unwrap(),
            json!({"kind": "decode", "detail": {"kind": "empty"}})
        );
    }

    #[test]
    fn test_multiple_errors_display() {
        let errors: ValidationErrors = vec![
            ValidationError::new(path!["foo"], Failure::MissingField),
            ValidationError::new(path!["bar", 1], Failure::Decode(DecodeError::Empty)),
        ]
        .into_iter()
        .collect();

        let display = errors.to_string();
        assert!(display.starts_with("2 validation errors:"));
        assert!(display.contains("1. foo: required field is missing [required]"));
        assert!(display.contains("2. bar[1]: empty value [empty]"));
    }
}
