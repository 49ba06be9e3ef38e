//! Access control and open options for the memory fabric.
//!
//! This crate provides the [`AccessMode`] and [`OpenOptions`] types used to
//! control how a fabric is opened, and the [`CallerContext`] carried by
//! every request so that scope access can be checked and the caller's
//! identity copied into event metadata.

#![warn(missing_docs)]

mod caller;

pub use caller::{authorize, CallerContext, Operation};

use serde::{Deserialize, Serialize};

/// Controls whether the fabric allows writes or is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessMode {
    /// Allow both reads and writes (default).
    #[default]
    ReadWrite,
    /// Read-only mode: every mutation returns `AccessDenied`.
    ReadOnly,
}

impl AccessMode {
    /// Whether mutations are refused.
    pub fn is_read_only(&self) -> bool {
        matches!(self, AccessMode::ReadOnly)
    }
}

/// Options for opening a fabric.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use fabric_security::{AccessMode, OpenOptions};
///
/// let opts = OpenOptions::new().access_mode(AccessMode::ReadOnly);
/// assert!(opts.access_mode.is_read_only());
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// The access mode for the fabric.
    pub access_mode: AccessMode,
    /// Create the data directory when it does not exist.
    pub create_if_missing: bool,
}

impl OpenOptions {
    /// Create a new `OpenOptions` with default settings (read-write mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the access mode.
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Set whether a missing data directory is created.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::ReadWrite,
            create_if_missing: true,
        }
    }
}
