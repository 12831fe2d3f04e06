//! Dictum Runtime Library
//!
//! This crate validates untyped input against [`dictum_core`] schemas:
//!
//! - **Validate trait**: one pass over the input producing an [`Instance`] tree
//! - **Instance**: decoded values, validity and failures per node
//! - **Error types**: located failures with structured paths, flat or nested
//!
//! # Example
//!
//! ```rust,ignore
//! use dictum_core::Schema;
//! use dictum_runtime::Validate;
//!
//! let schema = Schema::mapping()
//!     .field(Schema::string().named("foo"))
//!     .field(Schema::sequence(Schema::integer()).named("bar"))
//!     .build()?;
//!
//! let input = serde_json::json!({"foo": "x", "bar": ["1", "oops", 3]});
//! let instance = schema.validate(&input);
//!
//! assert!(!instance.is_valid());
//! for error in instance.errors() {
//!     println!("{}", error); // bar[1]: invalid integer value 'oops' [format]
//! }
//! ```

mod errors;
mod instance;
mod path;
mod report;
mod validate;

// Re-export public types
pub use errors::{Failure, ValidationError, ValidationErrors};
pub use instance::Instance;
pub use path::{Path, Segment};
pub use report::{ErrorItems, ErrorTree, Errors};
pub use validate::{aggregate, decode, validate, LocalValue, Validate};
