//! # memfabric
//!
//! Scoped shared memory for distributed agents: a key-value store and a
//! vector store partitioned by scope, a durable sequenced change log, and
//! wildcard change subscriptions delivered asynchronously.
//!
//! # Quick Start
//!
//! ```no_run
//! use memfabric::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fabric = Fabric::open("./fabric-data")?;
//! let caller = CallerContext::agent("planner");
//!
//! let memory = fabric.session(caller.clone(), "conversation-42");
//! memory.set("prefs.theme", "dark")?;
//! assert_eq!(memory.get("prefs.theme")?, Some(Value::from("dark")));
//!
//! let page = fabric.get_history(&caller, &HistoryFilter::new(), 10)?;
//! assert_eq!(page.events.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - [`fabric_core`]: scopes, keys, values, events, errors
//! - [`fabric_dispatch`]: patterns, subscriptions, the dispatcher
//! - [`fabric_durability`]: the WAL and the event log
//! - [`fabric_engine`]: `Fabric` and its primitives
//! - [`fabric_executor`]: serializable commands and `FabricClient`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;

pub use fabric_core;
pub use fabric_dispatch;
pub use fabric_durability;
pub use fabric_engine;
pub use fabric_executor;
pub use fabric_security;

pub use types::*;

/// Everything needed for typical use.
pub mod prelude {
    pub use crate::types::*;
    pub use fabric_engine::{Fabric, HistoryFilter, KvStore, LayeredMemory, ScopedMemory, VectorStore};
    pub use fabric_executor::{Command, Executor, FabricClient, Output};
}
