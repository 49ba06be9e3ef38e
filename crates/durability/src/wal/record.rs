//! Logged record types
//!
//! Change records carry the full event; recovery re-resolves the event's
//! scope handle, so partition ids never need to be stable across restarts.
//!
//! Records are MessagePack-encoded with field names (`to_vec_named`):
//! positional struct encoding cannot represent skipped optional fields or
//! flattened metadata.
//!
//! MessagePack has a single nil, so `Some(null)` and `None` collapse on the
//! wire. The event's `data` and `previous_data` are therefore written as an
//! explicit `absent` / `present` tag (see [`change_frame`]).

use super::WalError;
use chrono::{DateTime, Utc};
use fabric_core::{ChangeEvent, ScopeHandle, VectorMetadata};
use serde::{Deserialize, Serialize};

/// One entry in the write-ahead log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalRecord {
    /// A committed KV mutation
    Change {
        /// Global log sequence number
        lsn: u64,
        /// The event, exactly as delivered
        #[serde(with = "change_frame")]
        event: ChangeEvent,
    },
    /// A vector insert or replace
    VectorPut {
        /// Global log sequence number
        lsn: u64,
        /// Owning scope
        scope: ScopeHandle,
        /// Vector key
        key: String,
        /// Embedding
        embedding: Vec<f32>,
        /// Attached metadata
        metadata: VectorMetadata,
        /// Time of first insertion
        inserted_at: DateTime<Utc>,
    },
    /// A vector removal
    VectorDelete {
        /// Global log sequence number
        lsn: u64,
        /// Owning scope
        scope: ScopeHandle,
        /// Vector key
        key: String,
    },
}

impl WalRecord {
    /// Global log sequence number.
    pub fn lsn(&self) -> u64 {
        match self {
            WalRecord::Change { lsn, .. }
            | WalRecord::VectorPut { lsn, .. }
            | WalRecord::VectorDelete { lsn, .. } => *lsn,
        }
    }

    /// Serialize to MessagePack.
    pub fn encode(&self) -> Result<Vec<u8>, WalError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserialize from MessagePack; `offset` is reported on failure.
    pub fn decode(bytes: &[u8], offset: u64) -> Result<Self, WalError> {
        rmp_serde::from_slice(bytes).map_err(|e| WalError::Decode {
            offset,
            reason: e.to_string(),
        })
    }
}

/// Event encoding that keeps a stored JSON null distinct from a missing value.
mod change_frame {
    use chrono::{DateTime, Utc};
    use fabric_core::{ChangeEvent, EventAction, EventMetadata, ScopeKind, Value};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use uuid::Uuid;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum Slot<T> {
        Absent,
        Present(T),
    }

    impl<'a> Slot<&'a Value> {
        fn of(value: &'a Option<Value>) -> Self {
            match value {
                Some(v) => Slot::Present(v),
                None => Slot::Absent,
            }
        }
    }

    impl Slot<Value> {
        fn into_option(self) -> Option<Value> {
            match self {
                Slot::Present(v) => Some(v),
                Slot::Absent => None,
            }
        }
    }

    #[derive(Serialize)]
    struct FrameRef<'a> {
        id: &'a Uuid,
        scope: &'a ScopeKind,
        scope_id: &'a Option<String>,
        key: &'a str,
        action: &'a EventAction,
        data: Slot<&'a Value>,
        previous_data: Slot<&'a Value>,
        metadata: &'a EventMetadata,
        sequence: u64,
        timestamp: &'a DateTime<Utc>,
    }

    #[derive(Deserialize)]
    struct Frame {
        id: Uuid,
        scope: ScopeKind,
        scope_id: Option<String>,
        key: String,
        action: EventAction,
        data: Slot<Value>,
        previous_data: Slot<Value>,
        metadata: EventMetadata,
        sequence: u64,
        timestamp: DateTime<Utc>,
    }

    pub fn serialize<S: Serializer>(event: &ChangeEvent, serializer: S) -> Result<S::Ok, S::Error> {
        FrameRef {
            id: &event.id,
            scope: &event.scope,
            scope_id: &event.scope_id,
            key: &event.key,
            action: &event.action,
            data: Slot::of(&event.data),
            previous_data: Slot::of(&event.previous_data),
            metadata: &event.metadata,
            sequence: event.sequence,
            timestamp: &event.timestamp,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ChangeEvent, D::Error> {
        let frame = Frame::deserialize(deserializer)?;
        Ok(ChangeEvent {
            id: frame.id,
            scope: frame.scope,
            scope_id: frame.scope_id,
            key: frame.key,
            action: frame.action,
            data: frame.data.into_option(),
            previous_data: frame.previous_data.into_option(),
            metadata: frame.metadata,
            sequence: frame.sequence,
            timestamp: frame.timestamp,
        })
    }
}
