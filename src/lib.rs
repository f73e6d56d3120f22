//! Arguer
//!
//! Matches a positional argument list against a declarative format and
//! returns the arguments keyed by field name.
//!
//! A format is an ordered list of fields. A field is either a bare name, which
//! always takes the next argument, or a [`FieldDescriptor`] that may check the
//! argument's type or capability, declare a default, and constrain which other
//! fields may or must be present. Fields that can be skipped let callers leave
//! out arguments in the middle of a call:
//!
//! ```
//! use arguer::{FieldDescriptor, Format, TypeTag, Value};
//!
//! // (path, [options], mode)
//! let format = Format::new(vec![
//!     FieldDescriptor::new("path").of_type(TypeTag::String).into(),
//!     FieldDescriptor::new("options")
//!         .of_type(TypeTag::Object)
//!         .optional()
//!         .into(),
//!     FieldDescriptor::new("mode").of_type(TypeTag::Number).into(),
//! ]);
//!
//! let matches = format.apply(&[Value::from("/tmp"), Value::from(7)])?;
//! assert_eq!(matches.get("path"), Some(&Value::from("/tmp")));
//! assert!(!matches.contains_key("options"));
//! assert_eq!(matches.get("mode"), Some(&Value::from(7)));
//! # Ok::<(), arguer::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`value`]: argument values, type tags and capabilities
//! - [`format`]: field specifications and the compiled format
//! - [`matcher`]: the matching algorithm and its two calling conventions
//! - [`file_handling`]: loading named formats from YAML definition files
//! - [`error`]: the crate error type

pub mod error;
pub mod file_handling;
pub mod format;
pub mod matcher;
pub mod value;

pub use error::{Error, Rejection, Result};
pub use format::{CompiledFormat, FieldDescriptor, FieldSpec, Format, Names};
pub use matcher::{arguer, thrower, Matches};
pub use value::{Callable, Capability, TypeTag, Value};
