//! Concurrency control for the memory fabric
//!
//! Mutation of a `(scope, key)` is the only mandatory serialization point.
//! This crate provides the striped lock table that enforces it without a
//! global lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock_table;

pub use lock_table::{KeyGuard, LockTable, DEFAULT_LOCK_STRIPES};
