//! Executor error type.
//!
//! Flat, serializable, and free of non-`Clone` sources so it can cross a
//! wire boundary. Conversions from engine errors live in `convert.rs`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for executor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum Error {
    /// The workflow scope is not registered.
    #[error("scope not found: {scope}")]
    ScopeNotFound {
        /// Scope display form
        scope: String,
    },

    /// Malformed key.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key
        key: String,
        /// Why
        reason: String,
    },

    /// Malformed key pattern.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern
        pattern: String,
        /// Why
        reason: String,
    },

    /// Embedding length disagrees with the scope.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Scope dimension
        expected: usize,
        /// Rejected dimension
        actual: usize,
    },

    /// Any other malformed argument.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Why
        reason: String,
    },

    /// Actor scope of another actor, or a write on a read-only fabric.
    #[error("access denied to {scope}: {reason}")]
    AccessDenied {
        /// Scope display form
        scope: String,
        /// Why
        reason: String,
    },

    /// Storage failure.
    #[error("I/O error: {reason}")]
    Io {
        /// Description, including the underlying error
        reason: String,
    },

    /// Encoding failure.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description
        reason: String,
    },

    /// Internal failure.
    #[error("internal error: {reason}")]
    Internal {
        /// Description
        reason: String,
    },
}

impl Error {
    /// True for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ScopeNotFound { .. }
                | Error::InvalidKey { .. }
                | Error::InvalidPattern { .. }
                | Error::DimensionMismatch { .. }
                | Error::InvalidInput { .. }
                | Error::AccessDenied { .. }
        )
    }

    pub(crate) fn unexpected_output(command: &str) -> Self {
        Error::Internal {
            reason: format!("Unexpected output for {}", command),
        }
    }
}
