//! Core types for the memory fabric
//!
//! This crate defines the vocabulary shared by every other layer:
//! - Scopes: `ScopeKind`, `ScopeHandle`, `PartitionId`
//! - Keys: dotted hierarchical key validation
//! - Values: `Value`, a schemaless structured payload
//! - Events: `ChangeEvent`, `EventAction`, `EventMetadata`
//! - Records: `VersionedValue`, `MemoryRecord`, `VectorRecord`
//! - Errors: `FabricError`, `FabricResult`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod key;
pub mod record;
pub mod scope;
pub mod value;

pub use error::{FabricError, FabricResult};
pub use event::{ChangeEvent, EventAction, EventMetadata};
pub use key::{validate_key, KEY_SEPARATOR, MAX_KEY_LEN};
pub use record::{DistanceMetric, MemoryRecord, VectorMetadata, VectorRecord, VersionedValue};
pub use scope::{PartitionId, ScopeHandle, ScopeKind};
pub use value::Value;
