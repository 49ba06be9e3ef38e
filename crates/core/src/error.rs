//! Error taxonomy for the memory fabric
//!
//! Validation failures (`ScopeNotFound`, `PatternSyntax`,
//! `VectorDimensionMismatch`, `InvalidKey`, `InvalidInput`, `AccessDenied`)
//! are raised before any mutation or event is committed. Storage failures
//! surface from the write-ahead log.
//!
//! Handler failures during dispatch never reach this type: they are
//! isolated at the dispatcher boundary.

use thiserror::Error;

/// Result alias used across the fabric crates.
pub type FabricResult<T> = Result<T, FabricError>;

/// Errors returned by fabric operations.
#[derive(Debug, Error)]
pub enum FabricError {
    /// A scope that needs a pre-existing parent (e.g. a workflow) is unknown.
    #[error("scope not found: {scope}")]
    ScopeNotFound {
        /// Display form of the scope handle
        scope: String,
    },

    /// A subscription pattern is malformed.
    #[error("invalid pattern '{pattern}': {reason}")]
    PatternSyntax {
        /// The rejected pattern text
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// An embedding's length disagrees with the scope's established dimension.
    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    VectorDimensionMismatch {
        /// Dimension already established for the scope
        expected: usize,
        /// Dimension of the rejected embedding
        got: usize,
    },

    /// A memory key is malformed.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Any other malformed argument.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem
        message: String,
    },

    /// The caller may not touch this scope, or the fabric is read-only.
    #[error("access denied to {scope}: {reason}")]
    AccessDenied {
        /// Display form of the scope handle
        scope: String,
        /// Why access was refused
        reason: String,
    },

    /// I/O failure in the durable log.
    #[error("storage error: {message}")]
    Storage {
        /// Context for the failure
        message: String,
        /// Underlying I/O error, if any
        #[source]
        source: Option<std::io::Error>,
    },

    /// A value or log record could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure
        message: String,
    },

    /// The durable log contains a checksummed record that cannot be decoded.
    #[error("log corruption at offset {offset}: {reason}")]
    Corruption {
        /// Byte offset of the bad frame
        offset: u64,
        /// Description of the problem
        reason: String,
    },

    /// Runtime setup or other internal failure.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl FabricError {
    /// Build an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        FabricError::InvalidInput {
            message: message.into(),
        }
    }

    /// Build an `InvalidKey` error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        FabricError::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build a `PatternSyntax` error.
    pub fn pattern_syntax(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        FabricError::PatternSyntax {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Build a `ScopeNotFound` error.
    pub fn scope_not_found(scope: impl ToString) -> Self {
        FabricError::ScopeNotFound {
            scope: scope.to_string(),
        }
    }

    /// Build an `AccessDenied` error.
    pub fn access_denied(scope: impl ToString, reason: impl Into<String>) -> Self {
        FabricError::AccessDenied {
            scope: scope.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a `Storage` error wrapping an I/O error.
    pub fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
        FabricError::Storage {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Build a `Serialization` error.
    pub fn serialization(message: impl Into<String>) -> Self {
        FabricError::Serialization {
            message: message.into(),
        }
    }

    /// Build an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        FabricError::Internal {
            message: message.into(),
        }
    }

    /// True for errors raised while validating a call, before any effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FabricError::ScopeNotFound { .. }
                | FabricError::PatternSyntax { .. }
                | FabricError::VectorDimensionMismatch { .. }
                | FabricError::InvalidKey { .. }
                | FabricError::InvalidInput { .. }
                | FabricError::AccessDenied { .. }
        )
    }
}
