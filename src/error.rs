use thiserror::Error;

use crate::value::{Capability, TypeTag};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not enough arguments provided: at least {} required, {} given.", .required, .provided)]
    NotEnoughArguments { required: usize, provided: usize },

    #[error("Invalid argument for `{}` at position {}: {}", .field, .position, .reason)]
    InvalidArgument {
        field: String,
        position: usize,
        reason: Rejection,
    },

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("No formats were found in the format definition YAML. Is `{}` empty?", .path)]
    EmptyFormatDefinition { path: String },

    #[error("Invalid field name in format `{}`: name may not be empty", .0)]
    EmptyName(String),

    #[error("Invalid field name `{}` in format `{}`: name may not contain whitespace", .1, .0)]
    NameWithSpace(String, String),

    #[error("Found a non-unique field name in format `{}`: `{}`", .0, .1)]
    NonUniqueFieldName(String, String),

    #[error("Field `{}` in format `{}` references unknown field `{}`", .1, .0, .2)]
    UnknownFieldReference(String, String, String),
}

impl Error {
    pub fn empty_format_definition(path: String) -> Self {
        Self::EmptyFormatDefinition { path }
    }

    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }

    /// True for the two failures a match can produce, as opposed to file or
    /// definition errors.
    #[must_use]
    pub fn is_match_failure(&self) -> bool {
        matches!(
            self,
            Self::NotEnoughArguments { .. } | Self::InvalidArgument { .. }
        )
    }
}

/// The check that rejected an argument.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("expected type {}, found {}", .expected, .found)]
    Type { expected: TypeTag, found: TypeTag },

    #[error("type {} is not allowed", .0)]
    NegatedType(TypeTag),

    #[error("expected an instance of {}", .0)]
    Instance(Capability),

    #[error("an instance of {} is not allowed", .0)]
    NegatedInstance(Capability),

    #[error("mutually exclusive with `{}`", .0)]
    Mutex(String),

    #[error("requires `{}`", .0)]
    Requires(String),
}
