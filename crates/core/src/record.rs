//! Stored record shapes

use crate::scope::ScopeHandle;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value as held by the sharded store.
///
/// `version` is the partition sequence of the event that wrote the value,
/// so it keeps increasing across delete and re-create of the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedValue {
    /// Stored payload
    pub value: Value,
    /// Version assigned by the write
    pub version: u64,
    /// Time of the write
    pub timestamp: DateTime<Utc>,
}

/// Public view of a live key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Owning scope
    pub scope: ScopeHandle,
    /// Key within the scope
    pub key: String,
    /// Current value
    pub value: Value,
    /// Monotonic per `(scope, key)`
    pub version: u64,
    /// Time of the last write
    pub updated_at: DateTime<Utc>,
}

/// String-keyed metadata attached to a vector.
pub type VectorMetadata = serde_json::Map<String, serde_json::Value>;

/// An embedding with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Owning scope
    pub scope: ScopeHandle,
    /// Key within the scope
    pub key: String,
    /// Embedding, same dimension as every other vector in the scope
    pub embedding: Vec<f32>,
    /// Caller-defined metadata, returned with search hits
    pub metadata: VectorMetadata,
    /// Time of first insertion
    pub inserted_at: DateTime<Utc>,
}

/// Similarity function used to rank vectors.
///
/// All scores are normalized to "higher = more similar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity, range [-1, 1]
    #[default]
    Cosine,
    /// 1 / (1 + l2 distance), range (0, 1]
    Euclidean,
    /// Inner product, unbounded
    DotProduct,
}
