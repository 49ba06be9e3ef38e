//! Command handlers, one module per primitive.
//!
//! Each handler validates its arguments through the engine, calls the
//! primitive, and wraps the result in an [`Output`](crate::Output).

pub mod db;
pub mod history;
pub mod kv;
pub mod vector;
