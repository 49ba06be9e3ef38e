//! Output enum: the result of a successful command.

use fabric_core::{ChangeEvent, Value};
use fabric_engine::{FabricConfig, FabricStats, HistoryPage, VectorHit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of a successful [`Command`](crate::Command).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output", content = "data", rename_all = "snake_case")]
pub enum Output {
    /// No payload
    Unit,
    /// Reply to `Ping`
    Pong {
        /// Crate version of the server
        version: String,
    },
    /// Value that may be absent
    Maybe(Option<Value>),
    /// Value that is always present (`KvGet` with a default)
    Value(Value),
    /// Boolean answer
    Bool(bool),
    /// Key listing
    Keys(Vec<String>),
    /// Event produced by a KV mutation
    Event(Arc<ChangeEvent>),
    /// Similarity search hits, best first
    VectorHits(Vec<VectorHit>),
    /// One page of history
    History(HistoryPage),
    /// Counters snapshot
    Stats(StatsInfo),
    /// Active configuration
    Config(FabricConfig),
}

/// Serializable view of [`FabricStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsInfo {
    /// Scope partitions created
    pub partitions: usize,
    /// Live keys
    pub keys: usize,
    /// Events held in history
    pub events: usize,
    /// Stored vectors
    pub vectors: usize,
    /// Last log sequence number
    pub last_lsn: u64,
    /// Key lock acquisitions that waited
    pub lock_contention: u64,
    /// Live subscriptions
    pub subscriptions: usize,
    /// Deliveries queued
    pub dispatch_enqueued: u64,
    /// Deliveries completed
    pub dispatch_delivered: u64,
    /// Handler failures
    pub dispatch_failed: u64,
    /// Deliveries evicted from full lanes
    pub dispatch_dropped: u64,
}

impl StatsInfo {
    pub(crate) fn new(stats: FabricStats, subscriptions: usize) -> Self {
        Self {
            partitions: stats.partitions,
            keys: stats.keys,
            events: stats.events,
            vectors: stats.vectors,
            last_lsn: stats.last_lsn,
            lock_contention: stats.lock_contention,
            subscriptions,
            dispatch_enqueued: stats.dispatch.enqueued,
            dispatch_delivered: stats.dispatch.delivered,
            dispatch_failed: stats.dispatch.failed,
            dispatch_dropped: stats.dispatch.dropped,
        }
    }
}
