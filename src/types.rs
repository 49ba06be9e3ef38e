//! Public types for the fabric API.
//!
//! This module re-exports types from internal crates with a clean public interface.

// ============================================================================
// Scopes, keys and values
// ============================================================================

pub use fabric_core::{PartitionId, ScopeHandle, ScopeKind, Value};
pub use fabric_core::{validate_key, KEY_SEPARATOR, MAX_KEY_LEN};

// Events
pub use fabric_core::{ChangeEvent, EventAction, EventMetadata};

// Records
pub use fabric_core::{DistanceMetric, MemoryRecord, VectorMetadata, VectorRecord};

// Errors
pub use fabric_core::{FabricError, FabricResult};

// ============================================================================
// Engine
// ============================================================================

pub use fabric_engine::{FabricConfig, FabricStats, HistoryPage, VectorHit};

// Durability mode for configuration
pub use fabric_durability::DurabilityMode;

// Caller identity and open options
pub use fabric_security::{AccessMode, CallerContext, OpenOptions};

// ============================================================================
// Subscriptions
// ============================================================================

pub use fabric_dispatch::{
    handler_fn, Binding, DispatchStats, EventHandler, Pattern, SubscriptionGuard, SubscriptionId,
};
