//! Error types for schema inference and value decoding.

use thiserror::Error;

/// Errors produced while inferring schemas or decoding value trees.
#[derive(Error, Debug)]
pub enum Error {
    /// A field carries a serialization kind outside the supported set.
    #[error("unsupported field kind {kind} for field {field}")]
    UnsupportedKind { field: String, kind: String },

    /// The value tree's shape does not match what the target expects.
    #[error("expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },

    /// A nested error annotated with the field it occurred on.
    #[error("field {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<Error>,
    },

    /// An object key that resolves to no field by either naming convention.
    #[error("unexpected field {0}")]
    UnknownField(String),

    /// A type reference the descriptor pool cannot resolve.
    #[error("unknown type {0}")]
    UnknownType(String),

    /// Failed to parse or convert descriptor input.
    #[error("failed to parse descriptors: {0}")]
    Parse(String),
}

impl Error {
    pub(crate) fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::Mismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Annotate this error with the name of the field it unwound through.
    pub(crate) fn for_field(self, field: &str) -> Self {
        Error::Field {
            field: field.to_string(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for protoavro operations.
pub type Result<T> = std::result::Result<T, Error>;
