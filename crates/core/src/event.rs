//! Change events
//!
//! Every committed mutation produces exactly one immutable `ChangeEvent`.
//! Its field names are a stable wire contract consumed by agent SDKs:
//! `id`, `scope`, `scope_id`, `key`, `action`, `data`, `previous_data`,
//! `metadata`, `sequence`, `timestamp` (ISO-8601).

use crate::scope::{ScopeHandle, ScopeKind};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Kind of mutation recorded by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// A value was written
    Set,
    /// A value was removed
    Delete,
}

impl EventAction {
    /// Wire name (`"set"` / `"delete"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Set => "set",
            EventAction::Delete => "delete",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller identity injected by the orchestration layer.
///
/// Unknown fields round-trip through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Agent (node) that issued the mutation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Workflow the mutation ran under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Execution the mutation ran under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    /// Any additional collaborator-supplied fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Immutable record of one mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Unique event id
    pub id: Uuid,
    /// Kind of the scope that was mutated
    pub scope: ScopeKind,
    /// Id of the scope that was mutated (`None` for global)
    pub scope_id: Option<String>,
    /// Mutated key
    pub key: String,
    /// Set or delete
    pub action: EventAction,
    /// New value (`None` for deletes)
    pub data: Option<Value>,
    /// Value stored immediately before this event (`None` if absent)
    pub previous_data: Option<Value>,
    /// Caller identity
    pub metadata: EventMetadata,
    /// Position within the scope partition, strictly increasing from 1
    pub sequence: u64,
    /// Commit time
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Scope handle this event belongs to.
    pub fn scope_handle(&self) -> ScopeHandle {
        match (self.scope, &self.scope_id) {
            (ScopeKind::Global, _) => ScopeHandle::global(),
            (ScopeKind::Session, Some(id)) => ScopeHandle::session(id.clone()),
            (ScopeKind::Actor, Some(id)) => ScopeHandle::actor(id.clone()),
            (ScopeKind::Workflow, Some(id)) => ScopeHandle::workflow(id.clone()),
            // scope_id is always present for instance scopes; degrade to an empty id
            (kind, None) => match kind {
                ScopeKind::Session => ScopeHandle::session(""),
                ScopeKind::Actor => ScopeHandle::actor(""),
                _ => ScopeHandle::workflow(""),
            },
        }
    }

    /// Whether the event belongs to `scope`.
    pub fn is_in_scope(&self, scope: &ScopeHandle) -> bool {
        self.scope == scope.kind() && self.scope_id.as_deref() == scope.id()
    }

    /// True for `set` events.
    pub fn is_set(&self) -> bool {
        self.action == EventAction::Set
    }

    /// True for `delete` events.
    pub fn is_delete(&self) -> bool {
        self.action == EventAction::Delete
    }
}
