//! Error types for the research tracker
//!
//! Entity construction and deserialization surface these directly. The
//! repository layer absorbs storage errors and turns them into sentinel
//! return values, so callers mostly see `Validation` and `InvalidEnumValue`.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Research tracker error types
#[derive(Error, Debug)]
pub enum Error {
    /// An entity invariant was violated
    #[error("Validation error on {field}: {message}")]
    Validation {
        /// Offending field
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// A status/format tag did not match any known variant
    #[error("Invalid value {value:?} for {field}")]
    InvalidEnumValue {
        /// Enum-typed field
        field: String,
        /// The unrecognized tag
        value: String,
    },

    /// A stored timestamp could not be parsed as ISO-8601
    #[error("Invalid timestamp {value:?} for {field}: expected ISO-8601")]
    InvalidTimestamp {
        /// Timestamp field
        field: String,
        /// The unparseable text
        value: String,
    },

    /// The document store is not connected
    #[error("Document store unavailable")]
    StorageUnavailable,

    /// A document with the same `_id` already exists
    #[error("Duplicate key: document {0} already exists")]
    DuplicateKey(String),

    /// Any other document store failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Export format tag not supported
    #[error("Unsupported export format: {0}. Use json, csv, or xlsx.")]
    UnsupportedFormat(String),

    /// CSV/XLSX writer failure
    #[error("Export error: {0}")]
    ExportError(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a validation error for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an invalid-enum error for `field`.
    pub fn invalid_enum(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidEnumValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this is a validation failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
