//! Storage layer for the memory fabric
//!
//! Holds the live value of every `(partition, key)` pair. History lives in
//! the durable event log; this crate only answers "what is the value now".

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod sharded;

pub use sharded::{Shard, ShardedStore};
