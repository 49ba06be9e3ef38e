//! Memory key validation
//!
//! Keys are dot-segmented (`prefs.theme`, `user.42.history`). Every segment
//! must be non-empty, and a bare `*` segment is reserved for patterns.

use crate::error::{FabricError, FabricResult};

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '.';

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 512;

/// Validate a memory key.
pub fn validate_key(key: &str) -> FabricResult<()> {
    if key.is_empty() {
        return Err(FabricError::invalid_key(key, "key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(FabricError::invalid_key(
            key,
            format!("key exceeds {} bytes", MAX_KEY_LEN),
        ));
    }
    for (idx, segment) in key.split(KEY_SEPARATOR).enumerate() {
        if segment.is_empty() {
            return Err(FabricError::invalid_key(
                key,
                format!("empty segment at position {}", idx),
            ));
        }
        if segment == "*" {
            return Err(FabricError::invalid_key(
                key,
                "'*' is reserved for subscription patterns",
            ));
        }
        if segment.chars().any(char::is_control) {
            return Err(FabricError::invalid_key(
                key,
                "control characters are not allowed",
            ));
        }
    }
    Ok(())
}
