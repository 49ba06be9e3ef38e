//! Engine for the memory fabric
//!
//! Wires the lower layers into one `Fabric`:
//! - `scope`: scope handle to partition mapping
//! - `primitives`: `KvStore`, `VectorStore`, history queries
//! - `scoped`: caller- and scope-bound `ScopedMemory`
//! - `layered`: `LayeredMemory`, reads resolved through the caller's scopes
//! - `config`: `FabricConfig` loaded from `fabric.toml`
//! - `recovery`: WAL replay at open

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod layered;
pub mod primitives;
pub mod recovery;
pub mod scope;
pub mod scoped;

pub use config::{FabricConfig, CONFIG_FILE_NAME, DEFAULT_HISTORY_CAP};
pub use database::{Fabric, FabricStats, LOCK_FILE_NAME};
pub use layered::LayeredMemory;
pub use primitives::{HistoryFilter, HistoryPage, KvStore, VectorHit, VectorStore};
pub use recovery::RecoveryReport;
pub use scope::ScopeRegistry;
pub use scoped::ScopedMemory;

pub use fabric_dispatch::{
    handler_fn, Binding, DispatchStats, EventHandler, Pattern, SubscriptionGuard, SubscriptionId,
};
pub use fabric_durability::DurabilityMode;
pub use fabric_security::{AccessMode, CallerContext, OpenOptions};
