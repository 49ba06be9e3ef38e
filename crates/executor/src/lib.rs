//! Command execution layer for the memory fabric
//!
//! Every fabric operation that can cross a process boundary is a
//! [`Command`]; executing it yields an [`Output`] or an [`Error`].
//!
//! - `command`: the serde-tagged command enum
//! - `output`: results
//! - `error`, `convert`: flat executor errors and the engine mapping
//! - `executor`: routing to handlers
//! - `api`: `FabricClient`, a typed wrapper bound to one caller

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod command;
pub mod convert;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod output;

pub use api::{FabricClient, Vectors};
pub use command::Command;
pub use error::{Error, Result};
pub use executor::Executor;
pub use output::{Output, StatsInfo};
