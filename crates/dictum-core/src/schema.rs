//! Schema algebra: a closed set of node kinds composed into an immutable tree

use crate::decode::{
    BooleanDecoder, DateDecoder, DateTimeDecoder, DecodeError, IntegerDecoder, NumberDecoder,
    ScalarDecoder, StringDecoder,
};
use crate::error::SchemaError;
use crate::options::SchemaOptions;
use crate::value::Decoded;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Value-to-value function run on a scalar right after decoding.
pub type Transform = Arc<dyn Fn(Decoded) -> Decoded + Send + Sync>;

/// Predicate run on a scalar after transforms and the allowed-values check.
pub type Check = Arc<dyn Fn(&Decoded) -> Result<(), DecodeError> + Send + Sync>;

/// An immutable schema node.
///
/// Children are owned, so a schema tree is always finite and acyclic.
/// Nothing in a schema changes after `SchemaBuilder::build`, which makes a
/// single schema safe to share across any number of concurrent validations.
#[derive(Debug, Clone)]
pub struct Schema {
    name: Option<String>,
    nullable: bool,
    kind: SchemaKind,
}

/// Node kinds
#[derive(Debug, Clone)]
pub enum SchemaKind {
    Scalar(Scalar),
    Sequence(Sequence),
    Mapping(Mapping),
    Dictionary(Dictionary),
}

impl SchemaKind {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Scalar(_) => "scalar",
            SchemaKind::Sequence(_) => "sequence",
            SchemaKind::Mapping(_) => "mapping",
            SchemaKind::Dictionary(_) => "dictionary",
        }
    }
}

/// Leaf node: a decoder plus the checks applied to what it produces.
#[derive(Clone)]
pub struct Scalar {
    decoder: Arc<dyn ScalarDecoder>,
    one_of: Option<Vec<Value>>,
    transforms: Vec<Transform>,
    checks: Vec<Check>,
}

impl Scalar {
    pub fn decoder(&self) -> &dyn ScalarDecoder {
        self.decoder.as_ref()
    }

    pub fn allowed_values(&self) -> Option<&[Value]> {
        self.one_of.as_deref()
    }

    /// Decode a non-null raw value and run the post-decode pipeline:
    /// transforms, then the allowed-values check, then custom checks.
    pub fn decode(&self, raw: &Value) -> Result<Decoded, DecodeError> {
        let decoded = self.decoder.decode(raw)?;
        let decoded = self
            .transforms
            .iter()
            .fold(decoded, |value, transform| transform(value));

        if let Some(allowed) = &self.one_of {
            let encoded = self.decoder.encode(&decoded);
            if !allowed.contains(&encoded) {
                return Err(DecodeError::NotAllowed {
                    value: encoded.to_string(),
                });
            }
        }

        for check in &self.checks {
            check(&decoded)?;
        }

        Ok(decoded)
    }

    pub fn encode(&self, value: &Decoded) -> Value {
        self.decoder.encode(value)
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scalar")
            .field("decoder", &self.decoder)
            .field("one_of", &self.one_of)
            .field("transforms", &self.transforms.len())
            .field("checks", &self.checks.len())
            .finish()
    }
}

/// Ordered collection of elements sharing one schema.
#[derive(Debug, Clone)]
pub struct Sequence {
    element: Box<Schema>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl Sequence {
    pub fn element(&self) -> &Schema {
        &self.element
    }

    pub fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }
}

/// One declared key of a mapping
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub required: bool,
    pub schema: Schema,
}

/// Key-value collection with declared fields.
#[derive(Debug, Clone)]
pub struct Mapping {
    fields: Vec<Field>,
    strict: bool,
}

impl Mapping {
    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// Key-value collection with arbitrary keys and one value schema.
#[derive(Debug, Clone)]
pub struct Dictionary {
    value: Box<Schema>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl Dictionary {
    pub fn value(&self) -> &Schema {
        &self.value
    }

    pub fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }
}

impl Schema {
    pub fn string() -> SchemaBuilder {
        SchemaBuilder::new(Pending::Scalar(ScalarKind::String))
    }

    pub fn integer() -> SchemaBuilder {
        SchemaBuilder::new(Pending::Scalar(ScalarKind::Integer))
    }

    pub fn number() -> SchemaBuilder {
        SchemaBuilder::new(Pending::Scalar(ScalarKind::Number))
    }

    pub fn boolean() -> SchemaBuilder {
        SchemaBuilder::new(Pending::Scalar(ScalarKind::Boolean))
    }

    pub fn date() -> SchemaBuilder {
        SchemaBuilder::new(Pending::Scalar(ScalarKind::Date))
    }

    pub fn datetime() -> SchemaBuilder {
        SchemaBuilder::new(Pending::Scalar(ScalarKind::DateTime))
    }

    /// Scalar backed by a caller-supplied decoder.
    pub fn scalar(decoder: Arc<dyn ScalarDecoder>) -> SchemaBuilder {
        SchemaBuilder::new(Pending::Scalar(ScalarKind::Custom(decoder)))
    }

    pub fn sequence(element: SchemaBuilder) -> SchemaBuilder {
        SchemaBuilder::new(Pending::Sequence(Box::new(element)))
    }

    /// Mapping with no fields yet; add them with `SchemaBuilder::field`.
    pub fn mapping() -> SchemaBuilder {
        SchemaBuilder::new(Pending::Mapping(Vec::new()))
    }

    pub fn dictionary(value: SchemaBuilder) -> SchemaBuilder {
        SchemaBuilder::new(Pending::Dictionary(Box::new(value)))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Encode a decoded value back into raw form this schema accepts.
    ///
    /// Values whose structure does not match the schema fall back to
    /// `Decoded::to_raw`.
    pub fn encode(&self, value: &Decoded) -> Value {
        match (&self.kind, value) {
            (_, Decoded::Null) => Value::Null,
            (SchemaKind::Scalar(scalar), value) => scalar.encode(value),
            (SchemaKind::Sequence(seq), Decoded::Sequence(items)) => {
                Value::Array(items.iter().map(|item| seq.element.encode(item)).collect())
            }
            (SchemaKind::Mapping(mapping), Decoded::Mapping(entries)) => {
                let mut object = Map::new();
                for field in &mapping.fields {
                    if let Some(entry) = entries.get(&field.key) {
                        object.insert(field.key.clone(), field.schema.encode(entry));
                    }
                }
                Value::Object(object)
            }
            (SchemaKind::Dictionary(dict), Decoded::Mapping(entries)) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), dict.value.encode(v)))
                    .collect(),
            ),
            (_, other) => other.to_raw(),
        }
    }
}

enum Pending {
    Scalar(ScalarKind),
    Sequence(Box<SchemaBuilder>),
    Mapping(Vec<SchemaBuilder>),
    Dictionary(Box<SchemaBuilder>),
}

enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    DateTime,
    Custom(Arc<dyn ScalarDecoder>),
}

impl Pending {
    fn name(&self) -> &'static str {
        match self {
            Pending::Scalar(ScalarKind::String) => "string",
            Pending::Scalar(ScalarKind::Integer) => "integer",
            Pending::Scalar(ScalarKind::Number) => "number",
            Pending::Scalar(ScalarKind::Boolean) => "boolean",
            Pending::Scalar(ScalarKind::Date) => "date",
            Pending::Scalar(ScalarKind::DateTime) => "datetime",
            Pending::Scalar(ScalarKind::Custom(_)) => "custom scalar",
            Pending::Sequence(_) => "sequence",
            Pending::Mapping(_) => "mapping",
            Pending::Dictionary(_) => "dictionary",
        }
    }

    /// Options honored by this kind, besides `required` and `nullable`.
    fn supported_options(&self) -> &'static [&'static str] {
        match self {
            Pending::Scalar(ScalarKind::String) => {
                &["min_length", "max_length", "pattern", "one_of", "trim"]
            }
            Pending::Scalar(ScalarKind::Integer | ScalarKind::Number) => &["min", "max", "one_of"],
            Pending::Scalar(ScalarKind::Boolean | ScalarKind::Custom(_)) => &["one_of"],
            Pending::Scalar(ScalarKind::Date | ScalarKind::DateTime) => &["format", "one_of"],
            Pending::Sequence(_) | Pending::Dictionary(_) => &["min_length", "max_length"],
            Pending::Mapping(_) => &["strict"],
        }
    }
}

fn scalar_decoder(
    kind: ScalarKind,
    options: &SchemaOptions,
) -> Result<Arc<dyn ScalarDecoder>, SchemaError> {
    let decoder: Arc<dyn ScalarDecoder> = match kind {
        ScalarKind::String => {
            let mut decoder = StringDecoder::new()
                .trimmed(options.trim)
                .with_length(options.min_length, options.max_length);
            if let Some(pattern) = &options.pattern {
                let re = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                decoder = decoder.with_pattern(re);
            }
            Arc::new(decoder)
        }
        ScalarKind::Integer => Arc::new(IntegerDecoder::new().with_range(options.min, options.max)),
        ScalarKind::Number => Arc::new(NumberDecoder::new().with_range(options.min, options.max)),
        ScalarKind::Boolean => Arc::new(BooleanDecoder),
        ScalarKind::Date => match &options.format {
            Some(format) => Arc::new(DateDecoder::with_format(format.as_str())?),
            None => Arc::new(DateDecoder::new()),
        },
        ScalarKind::DateTime => match &options.format {
            Some(format) => Arc::new(DateTimeDecoder::with_format(format.as_str())?),
            None => Arc::new(DateTimeDecoder::new()),
        },
        ScalarKind::Custom(decoder) => decoder,
    };
    Ok(decoder)
}

/// Builds a [`Schema`] node and, recursively, its children.
///
/// Nothing is validated until `build`, which reports the first malformed
/// node as a [`SchemaError`].
///
/// ```rust,ignore
/// let schema = Schema::mapping()
///     .field(Schema::string().named("foo"))
///     .field(Schema::sequence(Schema::integer()).named("bar"))
///     .build()?;
/// ```
pub struct SchemaBuilder {
    name: Option<String>,
    options: SchemaOptions,
    kind: Pending,
    transforms: Vec<Transform>,
    checks: Vec<Check>,
    stray_fields: bool,
}

impl SchemaBuilder {
    fn new(kind: Pending) -> Self {
        Self {
            name: None,
            options: SchemaOptions::default(),
            kind,
            transforms: Vec::new(),
            checks: Vec::new(),
            stray_fields: false,
        }
    }

    /// Set the node name; a mapping field's key is its name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace all options at once.
    pub fn using(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.options.required = required;
        self
    }

    pub fn optional(self) -> Self {
        self.required(false)
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.options.nullable = nullable;
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.options.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.options.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.options.pattern = Some(pattern.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.options.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.options.max = Some(max);
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.options.format = Some(format.into());
        self
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.options.trim = trim;
        self
    }

    /// Append a transform, run after decoding and before any check.
    pub fn apply<F>(mut self, transform: F) -> Self
    where
        F: Fn(Decoded) -> Decoded + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(transform));
        self
    }

    /// Append a custom check, run after transforms.
    pub fn expect<F>(mut self, check: F) -> Self
    where
        F: Fn(&Decoded) -> Result<(), DecodeError> + Send + Sync + 'static,
    {
        self.checks.push(Arc::new(check));
        self
    }

    /// Declare a mapping field. The field's key is the child's name.
    pub fn field(mut self, child: SchemaBuilder) -> Self {
        match &mut self.kind {
            Pending::Mapping(fields) => fields.push(child),
            _ => self.stray_fields = true,
        }
        self
    }

    pub fn fields(self, children: impl IntoIterator<Item = SchemaBuilder>) -> Self {
        children.into_iter().fold(self, SchemaBuilder::field)
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        self.check_required("root")?;
        let schema = self.build_node()?;
        tracing::debug!(
            "Built {} schema {}",
            schema.kind.name(),
            schema.name().unwrap_or("<root>")
        );
        Ok(schema)
    }

    fn check_supported(&self) -> Result<(), SchemaError> {
        let kind = self.kind.name();
        let supported = self.kind.supported_options();

        for option in self.options.configured() {
            if option == "required" || option == "nullable" {
                continue;
            }
            if !supported.contains(&option) {
                return Err(SchemaError::UnsupportedOption { option, kind });
            }
        }

        if self.stray_fields {
            return Err(SchemaError::UnsupportedOption {
                option: "field",
                kind,
            });
        }

        if !matches!(self.kind, Pending::Scalar(_)) {
            if !self.transforms.is_empty() {
                return Err(SchemaError::UnsupportedOption {
                    option: "apply",
                    kind,
                });
            }
            if !self.checks.is_empty() {
                return Err(SchemaError::UnsupportedOption {
                    option: "expect",
                    kind,
                });
            }
        }

        self.options.check_bounds()
    }

    /// Only mapping fields can be optional.
    fn check_required(&self, position: &'static str) -> Result<(), SchemaError> {
        if self.options.required {
            Ok(())
        } else {
            Err(SchemaError::UnsupportedOption {
                option: "required",
                kind: position,
            })
        }
    }

    fn build_node(self) -> Result<Schema, SchemaError> {
        self.check_supported()?;

        let SchemaBuilder {
            name,
            options,
            kind,
            transforms,
            checks,
            ..
        } = self;

        let kind = match kind {
            Pending::Scalar(scalar) => SchemaKind::Scalar(Scalar {
                decoder: scalar_decoder(scalar, &options)?,
                one_of: options.one_of.clone(),
                transforms,
                checks,
            }),
            Pending::Sequence(element) => {
                element.check_required("sequence element")?;
                SchemaKind::Sequence(Sequence {
                    element: Box::new(element.build_node()?),
                    min_length: options.min_length,
                    max_length: options.max_length,
                })
            }
            Pending::Mapping(children) => {
                let mut fields = Vec::with_capacity(children.len());
                let mut seen = HashSet::new();
                for (position, child) in children.into_iter().enumerate() {
                    let required = child.options.required;
                    let schema = child.build_node()?;
                    let key = schema
                        .name
                        .clone()
                        .ok_or(SchemaError::UnnamedField(position))?;
                    if !seen.insert(key.clone()) {
                        return Err(SchemaError::DuplicateField(key));
                    }
                    fields.push(Field {
                        key,
                        required,
                        schema,
                    });
                }
                SchemaKind::Mapping(Mapping {
                    fields,
                    strict: options.strict,
                })
            }
            Pending::Dictionary(value) => {
                value.check_required("dictionary value")?;
                SchemaKind::Dictionary(Dictionary {
                    value: Box::new(value.build_node()?),
                    min_length: options.min_length,
                    max_length: options.max_length,
                })
            }
        };

        Ok(Schema {
            name,
            nullable: options.nullable,
            kind,
        })
    }
}
