//! Error conversion from engine error types.
//!
//! Maps [`FabricError`] to the executor's flat [`Error`].

use crate::Error;
use fabric_core::FabricError;

impl From<FabricError> for Error {
    fn from(err: FabricError) -> Self {
        match err {
            FabricError::ScopeNotFound { scope } => Error::ScopeNotFound { scope },

            // Validation errors
            FabricError::InvalidKey { key, reason } => Error::InvalidKey { key, reason },
            FabricError::PatternSyntax { pattern, reason } => {
                Error::InvalidPattern { pattern, reason }
            }
            FabricError::VectorDimensionMismatch { expected, got } => Error::DimensionMismatch {
                expected,
                actual: got,
            },
            FabricError::InvalidInput { message } => Error::InvalidInput { reason: message },
            FabricError::AccessDenied { scope, reason } => Error::AccessDenied { scope, reason },

            // System errors
            FabricError::Storage { message, source } => {
                let reason = if let Some(ref src) = source {
                    format!("{}: {}", message, src)
                } else {
                    message
                };
                Error::Io { reason }
            }
            FabricError::Serialization { message } => Error::Serialization { reason: message },
            FabricError::Corruption { offset, reason } => Error::Io {
                reason: format!("Data corruption at offset {}: {}", offset, reason),
            },
            FabricError::Internal { message } => Error::Internal { reason: message },
        }
    }
}

/// Convert a `FabricResult` to an executor Result.
pub fn convert_result<T>(result: fabric_core::FabricResult<T>) -> crate::Result<T> {
    result.map_err(Error::from)
}
