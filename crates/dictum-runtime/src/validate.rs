//! The two-phase validation engine.
//!
//! Validation is one recursive traversal composed of two stages:
//!
//! - [`decode`] runs top-down at every visited node, decoding scalars and
//!   checking container shapes before any child is visited;
//! - [`aggregate`] runs bottom-up as each call returns, folding the
//!   validity of the children into the parent.
//!
//! Siblings never short-circuit each other: every element and every field
//! is visited, so one pass yields the complete failure tree.

use crate::errors::Failure;
use crate::instance::{Instance, Local};
use crate::path::Segment;
use dictum_core::{
    check_length, DecodeError, Decoded, Dictionary, Mapping, Schema, SchemaKind, Sequence,
    Shape,
};
use serde_json::{Map, Value};
use std::ptr;

/// Trait for schemas that can validate raw input.
///
/// # Example
///
/// ```rust,ignore
/// use dictum_runtime::Validate;
///
/// let instance = schema.validate(&input);
/// if !instance.is_valid() {
///     for error in instance.errors() {
///         eprintln!("{}", error);
///     }
/// }
/// ```
pub trait Validate {
    /// Match `raw` against this schema, collecting every failure.
    fn validate<'a>(&'a self, raw: &'a Value) -> Instance<'a>;
}

impl Validate for Schema {
    fn validate<'a>(&'a self, raw: &'a Value) -> Instance<'a> {
        validate(self, raw)
    }
}

/// Outcome of the top-down stage at one node.
#[derive(Debug, Clone)]
pub enum LocalValue<'a> {
    Scalar(Decoded),
    /// `null` accepted by a nullable node of any kind
    Null,
    Sequence(&'a Sequence, &'a [Value]),
    Mapping(&'a Mapping, &'a Map<String, Value>),
    Dictionary(&'a Dictionary, &'a Map<String, Value>),
}

impl PartialEq for LocalValue<'_> {
    /// Schema parts compare by identity, input by value.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LocalValue::Scalar(a), LocalValue::Scalar(b)) => a == b,
            (LocalValue::Null, LocalValue::Null) => true,
            (LocalValue::Sequence(s, a), LocalValue::Sequence(t, b)) => ptr::eq(*s, *t) && a == b,
            (LocalValue::Mapping(s, a), LocalValue::Mapping(t, b)) => ptr::eq(*s, *t) && a == b,
            (LocalValue::Dictionary(s, a), LocalValue::Dictionary(t, b)) => {
                ptr::eq(*s, *t) && a == b
            }
            _ => false,
        }
    }
}

/// Top-down stage: decode a scalar, or check a container's shape.
///
/// Nulls are accepted at nullable nodes of every kind. At scalars a blank
/// string counts as null, so it is only accepted when the node is nullable.
/// Whether whitespace alone is blank is up to the decoder.
pub fn decode<'a>(schema: &'a Schema, raw: &'a Value) -> Result<LocalValue<'a>, Failure> {
    if raw.is_null() && schema.is_nullable() {
        return Ok(LocalValue::Null);
    }

    match schema.kind() {
        SchemaKind::Scalar(scalar) => {
            if raw.is_null() {
                return Err(Failure::Decode(DecodeError::Null));
            }
            if scalar.decoder().is_blank(raw) {
                return if schema.is_nullable() {
                    Ok(LocalValue::Null)
                } else {
                    Err(Failure::Decode(DecodeError::Empty))
                };
            }
            scalar
                .decode(raw)
                .map(LocalValue::Scalar)
                .map_err(Failure::from)
        }
        SchemaKind::Sequence(sequence) => raw
            .as_array()
            .map(|items| LocalValue::Sequence(sequence, items.as_slice()))
            .ok_or_else(|| type_mismatch("sequence", raw)),
        SchemaKind::Mapping(mapping) => raw
            .as_object()
            .map(|entries| LocalValue::Mapping(mapping, entries))
            .ok_or_else(|| type_mismatch("mapping", raw)),
        SchemaKind::Dictionary(dictionary) => raw
            .as_object()
            .map(|entries| LocalValue::Dictionary(dictionary, entries))
            .ok_or_else(|| type_mismatch("mapping", raw)),
    }
}

/// Bottom-up stage: a node is valid iff it decoded locally and every child
/// is valid.
pub fn aggregate(local_ok: bool, children: &[Instance<'_>]) -> bool {
    local_ok && children.iter().all(Instance::is_valid)
}

/// Validate `raw` against `schema`.
///
/// Never fails: every problem is recorded on the returned instance tree.
pub fn validate<'a>(schema: &'a Schema, raw: &'a Value) -> Instance<'a> {
    let instance = validate_node(schema, raw, None);
    tracing::debug!(
        "Validated {} input against {} schema: valid={}, errors={}",
        Shape::of(raw),
        schema.kind().name(),
        instance.is_valid(),
        instance.errors().count()
    );
    instance
}

fn validate_node<'a>(schema: &'a Schema, raw: &'a Value, segment: Option<Segment>) -> Instance<'a> {
    let local = match decode(schema, raw) {
        Ok(local) => local,
        Err(failure) => {
            tracing::trace!("Decode failed at {:?}: {}", segment, failure);
            return Instance::failed(Some(schema), Some(raw), segment, failure);
        }
    };

    match local {
        LocalValue::Null => Instance::decoded(schema, raw, segment, Decoded::Null),
        LocalValue::Scalar(value) => Instance::decoded(schema, raw, segment, value),
        LocalValue::Sequence(sequence, items) => {
            let children = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    validate_node(sequence.element(), item, Some(Segment::Index(index)))
                })
                .collect();
            let local_failure =
                length_failure(items.len(), sequence.min_length(), sequence.max_length());
            Instance::container(schema, raw, segment, Local::Sequence, local_failure, children)
        }
        LocalValue::Mapping(mapping, entries) => {
            let children = validate_fields(mapping, entries);
            Instance::container(schema, raw, segment, Local::Mapping, None, children)
        }
        LocalValue::Dictionary(dictionary, entries) => {
            let children = entries
                .iter()
                .map(|(key, value)| {
                    validate_node(dictionary.value(), value, Some(Segment::Key(key.clone())))
                })
                .collect();
            let local_failure = length_failure(
                entries.len(),
                dictionary.min_length(),
                dictionary.max_length(),
            );
            Instance::container(schema, raw, segment, Local::Mapping, local_failure, children)
        }
    }
}

/// Declared fields in declaration order, then (strict only) unknown keys in
/// input order.
fn validate_fields<'a>(mapping: &'a Mapping, entries: &'a Map<String, Value>) -> Vec<Instance<'a>> {
    let mut children = Vec::with_capacity(mapping.fields().len());

    for field in mapping.fields() {
        let segment = Segment::Key(field.key.clone());
        match entries.get(&field.key) {
            Some(value) => children.push(validate_node(&field.schema, value, Some(segment))),
            None if field.required => {
                tracing::trace!("Missing required field {}", field.key);
                children.push(Instance::failed(
                    Some(&field.schema),
                    None,
                    Some(segment),
                    Failure::MissingField,
                ));
            }
            None => {}
        }
    }

    if mapping.is_strict() {
        for (key, value) in entries {
            if mapping.field(key).is_none() {
                tracing::trace!("Unexpected field {}", key);
                children.push(Instance::failed(
                    None,
                    Some(value),
                    Some(Segment::Key(key.clone())),
                    Failure::UnexpectedField,
                ));
            }
        }
    }

    children
}

fn type_mismatch(expected: &'static str, raw: &Value) -> Failure {
    Failure::TypeMismatch {
        expected,
        found: Shape::of(raw),
    }
}

fn length_failure(actual: usize, min: Option<usize>, max: Option<usize>) -> Option<Failure> {
    check_length(actual, min, max).err().map(Failure::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn foo_bar() -> Schema {
        Schema::mapping()
            .field(Schema::string().named("foo"))
            .field(Schema::sequence(Schema::integer()).named("bar"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_decode_stage_scalar() {
        let schema = Schema::integer().build().unwrap();
        assert_eq!(
            decode(&schema, &json!("12")),
            Ok(LocalValue::Scalar(Decoded::Integer(12)))
        );
        assert_eq!(
            decode(&schema, &json!(null)),
            Err(Failure::Decode(DecodeError::Null))
        );
        assert_eq!(
            decode(&schema, &json!("   ")),
            Err(Failure::Decode(DecodeError::Empty))
        );
    }

    #[test]
    fn test_decode_stage_nullable() {
        let schema = Schema::string().nullable(true).build().unwrap();
        assert_eq!(decode(&schema, &json!(null)), Ok(LocalValue::Null));
        assert_eq!(decode(&schema, &json!("")), Ok(LocalValue::Null));

        let schema = Schema::sequence(Schema::string()).nullable(true).build().unwrap();
        assert_eq!(decode(&schema, &json!(null)), Ok(LocalValue::Null));
    }

    #[test]
    fn test_decode_stage_container_shapes() {
        let schema = foo_bar();
        assert_eq!(
            decode(&schema, &json!(["foo"])),
            Err(Failure::TypeMismatch {
                expected: "mapping",
                found: Shape::Sequence
            })
        );
        assert!(matches!(
            decode(&schema, &json!({})),
            Ok(LocalValue::Mapping(_, _))
        ));
    }

    #[test]
    fn test_aggregate_stage() {
        let schema = Schema::integer().build().unwrap();
        let good = json!(1);
        let bad = json!("x");
        let valid = validate(&schema, &good);
        let invalid = validate(&schema, &bad);

        assert!(aggregate(true, &[]));
        assert!(!aggregate(false, &[]));
        assert!(aggregate(true, std::slice::from_ref(&valid)));
        assert!(!aggregate(true, &[valid, invalid]));
    }

    #[test]
    fn test_valid_mapping() {
        let schema = foo_bar();
        let input = json!({"foo": "Some text", "bar": ["1", "2", "3"]});
        let instance = schema.validate(&input);

        assert!(instance.is_valid());
        assert_eq!(instance.failure(), None);
        assert_eq!(
            instance.value().unwrap().to_raw(),
            json!({"foo": "Some text", "bar": [1, 2, 3]})
        );
    }

    #[test]
    fn test_failure_marks_every_ancestor() {
        let schema = foo_bar();
        let input = json!({"foo": "x", "bar": ["1", "oops", 3]});
        let instance = schema.validate(&input);

        assert!(!instance.is_valid());
        assert_eq!(instance.failure(), Some(&Failure::Aggregate));
        assert!(instance.decoded_locally());
        assert_eq!(instance.value(), None);

        let foo = instance.field("foo").unwrap();
        assert!(foo.is_valid());
        assert_eq!(foo.value(), Some(Decoded::from("x")));

        let bar = instance.field("bar").unwrap();
        assert!(!bar.is_valid());
        assert_eq!(bar.failure(), Some(&Failure::Aggregate));

        let validity: Vec<_> = bar.children().iter().map(Instance::is_valid).collect();
        assert_eq!(validity, vec![true, false, true]);
        assert!(bar.item(1).unwrap().failure().unwrap().is_decode());
    }

    #[test]
    fn test_type_mismatch_has_no_children() {
        let schema = foo_bar();
        let input = json!({"foo": "x", "bar": "1,2,3"});
        let instance = schema.validate(&input);

        let bar = instance.field("bar").unwrap();
        assert!(bar.children().is_empty());
        assert!(!bar.decoded_locally());
        assert_eq!(bar.failure().map(Failure::rule), Some("type"));
    }

    #[test]
    fn test_missing_required_field() {
        let schema = foo_bar();
        let input = json!({"bar": ["1"]});
        let instance = schema.validate(&input);

        let foo = instance.field("foo").unwrap();
        assert_eq!(foo.failure(), Some(&Failure::MissingField));
        assert_eq!(foo.raw(), None);
        assert!(foo.schema().is_some());

        let errors = instance.validation_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].path, path!["foo"]);
    }

    #[test]
    fn test_optional_field_omitted() {
        let schema = Schema::mapping()
            .field(Schema::string().named("name"))
            .field(Schema::integer().named("age").optional())
            .build()
            .unwrap();
        let input = json!({"name": "Ada"});
        let instance = schema.validate(&input);

        assert!(instance.is_valid());
        assert_eq!(instance.children().len(), 1);
        assert_eq!(instance.value().unwrap().to_raw(), json!({"name": "Ada"}));
    }

    #[test]
    fn test_unknown_keys_ignored_unless_strict() {
        let input = json!({"name": "Ada", "extra": 1, "more": true});

        let lenient = Schema::mapping()
            .field(Schema::string().named("name"))
            .build()
            .unwrap();
        let instance = lenient.validate(&input);
        assert!(instance.is_valid());
        assert_eq!(instance.value().unwrap().to_raw(), json!({"name": "Ada"}));

        let strict = Schema::mapping()
            .field(Schema::string().named("name"))
            .strict(true)
            .build()
            .unwrap();
        let instance = strict.validate(&input);
        assert!(!instance.is_valid());

        let errors = instance.validation_errors();
        let paths: Vec<_> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["extra", "more"]);
        assert!(errors.iter().all(|e| e.failure == Failure::UnexpectedField));
        assert!(instance.field("extra").unwrap().schema().is_none());
    }

    #[test]
    fn test_sequence_length_is_local_failure() {
        let schema = Schema::sequence(Schema::integer())
            .min_length(2)
            .build()
            .unwrap();

        let empty = json!([]);
        let instance = schema.validate(&empty);
        assert_eq!(
            instance.failure(),
            Some(&Failure::Decode(DecodeError::TooShort { min: 2, actual: 0 }))
        );

        // Elements are still visited when the length check fails.
        let short = json!(["x"]);
        let instance = schema.validate(&short);
        assert_eq!(instance.children().len(), 1);
        assert_eq!(instance.validation_errors().len(), 2);
    }

    #[test]
    fn test_empty_sequence_is_valid() {
        let schema = Schema::sequence(Schema::integer()).build().unwrap();
        let input = json!([]);
        let instance = schema.validate(&input);
        assert!(instance.is_valid());
        assert_eq!(instance.value(), Some(Decoded::Sequence(vec![])));
    }

    #[test]
    fn test_dictionary_validates_every_entry() {
        let schema = Schema::dictionary(Schema::integer()).max_length(3).build().unwrap();
        let input = json!({"x": "1", "y": "two", "z": 3});
        let instance = schema.validate(&input);

        assert!(!instance.is_valid());
        let errors = instance.validation_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].path, path!["y"]);

        let input = json!({"a": 1, "b": 2, "c": 3, "d": 4});
        let instance = schema.validate(&input);
        assert_eq!(instance.failure().map(Failure::rule), Some("maxLength"));
    }

    #[test]
    fn test_nullable_container_decodes_to_null() {
        let schema = Schema::mapping()
            .field(Schema::sequence(Schema::string()).named("tags").nullable(true))
            .build()
            .unwrap();
        let input = json!({"tags": null});
        let instance = schema.validate(&input);

        assert!(instance.is_valid());
        assert_eq!(instance.value().unwrap().get("tags"), Some(&Decoded::Null));
    }

    #[test]
    fn test_untrimmed_string_keeps_whitespace() {
        let schema = Schema::mapping()
            .field(Schema::string().named("raw").trim(false))
            .field(Schema::string().named("trimmed").nullable(true))
            .build()
            .unwrap();

        let input = json!({"raw": "   ", "trimmed": "   "});
        let value = schema.validate(&input).into_result().unwrap();
        assert_eq!(value.get("raw"), Some(&Decoded::from("   ")));
        assert_eq!(value.get("trimmed"), Some(&Decoded::Null));

        let input = json!({"raw": "", "trimmed": "x"});
        let instance = schema.validate(&input);
        assert_eq!(
            instance.field("raw").unwrap().failure(),
            Some(&Failure::Decode(DecodeError::Empty))
        );
    }

    #[test]
    fn test_integer_maximum_above_f64_precision() {
        let schema = Schema::integer().max(9_007_199_254_740_992.0).build().unwrap();

        let input = json!(9_007_199_254_740_993i64);
        let instance = schema.validate(&input);
        assert!(!instance.is_valid());
        assert_eq!(instance.failure().map(Failure::rule), Some("range"));

        let input = json!(9_007_199_254_740_992i64);
        assert!(schema.validate(&input).is_valid());
    }

    #[test]
    fn test_into_result() {
        let schema = foo_bar();

        let good = json!({"foo": "a", "bar": []});
        assert!(schema.validate(&good).into_result().is_ok());

        let bad = json!({"foo": 1, "bar": [true]});
        let errors = schema.validate(&bad).into_result().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors[0].path, path!["foo"]);
        assert_eq!(errors.errors[1].path, path!["bar", 0]);
    }
}
