//! The option map recognized by schema builders.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration attached to a schema node at build time.
///
/// Which options apply depends on the node kind; the builder rejects
/// options a kind cannot honor (a `pattern` on an integer, `strict` on a
/// sequence) instead of silently ignoring them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaOptions {
    /// Mapping fields only: whether absence is a failure.
    pub required: bool,
    /// Mappings only: flag input keys that match no declared field.
    pub strict: bool,
    /// Accept `null` (and blank strings at scalars) as a null value.
    pub nullable: bool,

    /// Characters for strings, items for sequences, entries for dictionaries.
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,

    // Number validation
    pub min: Option<f64>,
    pub max: Option<f64>,

    /// Scalars only: the encoded value must equal one of these.
    pub one_of: Option<Vec<Value>>,
    /// Dates and timestamps only: chrono format string.
    pub format: Option<String>,
    /// Strings only: strip surrounding whitespace before checks.
    pub trim: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            required: true,
            strict: false,
            nullable: false,
            min_length: None,
            max_length: None,
            pattern: None,
            min: None,
            max: None,
            one_of: None,
            format: None,
            trim: true,
        }
    }
}

impl SchemaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from an untyped value, e.g. a section of a JSON config.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value).map_err(|e| SchemaError::InvalidOptions(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(text).map_err(|e| SchemaError::InvalidOptions(e.to_string()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(text).map_err(|e| SchemaError::InvalidOptions(e.to_string()))
    }

    /// Names of the options set away from their defaults.
    pub fn configured(&self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut set = Vec::new();
        if self.required != defaults.required {
            set.push("required");
        }
        if self.strict {
            set.push("strict");
        }
        if self.nullable {
            set.push("nullable");
        }
        if self.min_length.is_some() {
            set.push("min_length");
        }
        if self.max_length.is_some() {
            set.push("max_length");
        }
        if self.pattern.is_some() {
            set.push("pattern");
        }
        if self.min.is_some() {
            set.push("min");
        }
        if self.max.is_some() {
            set.push("max");
        }
        if self.one_of.is_some() {
            set.push("one_of");
        }
        if self.format.is_some() {
            set.push("format");
        }
        if self.trim != defaults.trim {
            set.push("trim");
        }
        set
    }

    /// Check that lower bounds do not exceed upper bounds.
    pub fn check_bounds(&self) -> Result<(), SchemaError> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(SchemaError::InvertedBounds {
                    option: "length",
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(SchemaError::InvertedBounds {
                    option: "range",
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = SchemaOptions::default();
        assert!(options.required);
        assert!(!options.strict);
        assert!(!options.nullable);
        assert!(options.trim);
        assert!(options.configured().is_empty());
    }

    #[test]
    fn test_from_value_fills_defaults() {
        let options = SchemaOptions::from_value(json!({
            "strict": true,
            "min_length": 1,
        }))
        .unwrap();

        assert_eq!(
            options,
            SchemaOptions {
                strict: true,
                min_length: Some(1),
                ..Default::default()
            }
        );
        assert_eq!(options.configured(), vec!["strict", "min_length"]);
    }

    #[test]
    fn test_from_yaml() {
        let options = SchemaOptions::from_yaml_str(
            "required: false\nnullable: true\none_of: [one, two]\n",
        )
        .unwrap();

        assert!(!options.required);
        assert!(options.nullable);
        assert_eq!(options.one_of, Some(vec![json!("one"), json!("two")]));
    }

    #[test]
    fn test_unknown_options_are_rejected() {
        let err = SchemaOptions::from_json_str(r#"{"stritc": true}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidOptions(_)));
    }

    #[test]
    fn test_inverted_bounds() {
        let options = SchemaOptions {
            min: Some(5.0),
            max: Some(1.0),
            ..Default::default()
        };
        assert!(matches!(
            options.check_bounds(),
            Err(SchemaError::InvertedBounds { option: "range", .. })
        ));
    }
}
