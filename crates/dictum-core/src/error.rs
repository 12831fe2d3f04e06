use thiserror::Error;

/// Failures detected while building a schema, before any input is seen.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Inverted bounds for {option}: {min} > {max}")]
    InvertedBounds {
        option: &'static str,
        min: String,
        max: String,
    },

    #[error("Mapping field at position {0} has no name")]
    UnnamedField(usize),

    #[error("Duplicate mapping field: {0}")]
    DuplicateField(String),

    #[error("Option '{option}' is not supported by {kind} schemas")]
    UnsupportedOption {
        option: &'static str,
        kind: &'static str,
    },

    #[error("Invalid options document: {0}")]
    InvalidOptions(String),
}
