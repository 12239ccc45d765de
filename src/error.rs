//! Error types for mapping operations.
//!
//! This module provides the [`MappingError`] type for all mapping operations
//! and the [`Result`] convenience type.

use thiserror::Error;

/// Error type for all mapping operations.
///
/// Variants fall into two classes. Expression problems are local to one rule:
/// the reader logs them and the rule yields no value. Everything else is a
/// profile, schema, or input defect and aborts the whole mapping invocation
/// (see [`MappingError::is_fatal`]).
#[derive(Error, Debug)]
pub enum MappingError {
    /// A destination path is empty or carries an array marker on a non-terminal segment.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A value kind does not fit the destination path or the existing document node.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A rule expression could not be tokenized or evaluated.
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// The tenant timezone configured for `###TODAY###` cannot be resolved.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The MARC-in-JSON input record is malformed.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A mapping profile or configuration document is malformed.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// A reference data or tenant settings document is malformed.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while loading a profile or configuration file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MappingError {
    /// Whether this error aborts the whole mapping invocation.
    ///
    /// Only [`MappingError::InvalidExpression`] is recoverable: the offending
    /// rule degrades to a missing value and the remaining rules still run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidExpression(_))
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MappingError`].
pub type Result<T> = std::result::Result<T, MappingError>;
