//! Schema algebra, scalar decoders and configuration for dictum

pub mod decode;
pub mod error;
pub mod options;
pub mod schema;
pub mod value;

pub use decode::{
    check_length, BooleanDecoder, DateDecoder, DateTimeDecoder, DecodeError, IntegerDecoder,
    NumberDecoder, ScalarDecoder, StringDecoder,
};
pub use error::SchemaError;
pub use options::SchemaOptions;
pub use schema::{
    Check, Dictionary, Field, Mapping, Scalar, Schema, SchemaBuilder, SchemaKind, Sequence,
    Transform,
};
pub use value::{Decoded, Shape};
