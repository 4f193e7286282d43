//! Error types for parsing route definitions.

use thiserror::Error;

use crate::registry::Role;

/// Errors that can occur while compiling a definition document.
///
/// Every variant aborts the whole parse; no partial route list is ever
/// returned alongside an error.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not valid JSON.
    #[error("Definition is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown or malformed schema version string.
    #[error("Schema version {version:?} rejected: {reason}")]
    SchemaVersion { version: String, reason: String },

    /// The document failed the schema check. Carries the first violation.
    #[error("Validation failed at {path:?}: {message}")]
    Validation { path: String, message: String },

    /// The tree shape cannot be walked.
    #[error("Structural error at {location}: {reason}")]
    Structural { location: String, reason: String },

    /// A node object could not be decoded into its typed fields.
    #[error("Could not decode node at {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    /// A node could not be merged with its parent.
    #[error("Merge failed at {location}: {reason}")]
    Merge { location: String, reason: String },

    /// A function or group name did not resolve.
    #[error("Function {name} at {location}: {reason}")]
    Reference {
        name: String,
        location: String,
        reason: String,
    },

    /// A name resolved to a function registered with the other role.
    #[error("Function {name} at {location} is registered as {actual}, expected {expected}")]
    RoleMismatch {
        name: String,
        location: String,
        expected: Role,
        actual: Role,
    },
}

impl ParseError {
    pub(crate) fn structural(location: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::Structural {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn reference(
        name: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ParseError::Reference {
            name: name.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;
