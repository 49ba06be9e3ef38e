//! Command enum: every operation the executor accepts.
//!
//! Commands are plain data: they serialize to JSON (or MessagePack) with an
//! externally visible `"command"` tag so that remote agent SDKs can send
//! them over any transport. Subscriptions are deliberately absent; they
//! carry in-process handlers and go through the `Fabric` directly.

use chrono::{DateTime, Utc};
use fabric_core::{EventAction, ScopeHandle, ScopeKind, Value, VectorMetadata};
use serde::{Deserialize, Serialize};

/// An operation to run against the fabric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    // =========================================================================
    // KV (5)
    // =========================================================================
    /// Read a key. `default` is returned when the key is absent.
    KvGet {
        /// Target scope
        scope: ScopeHandle,
        /// Dotted key
        key: String,
        /// Fallback value
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
    /// Write a key.
    KvSet {
        /// Target scope
        scope: ScopeHandle,
        /// Dotted key
        key: String,
        /// New value
        value: Value,
    },
    /// Remove a key.
    KvDelete {
        /// Target scope
        scope: ScopeHandle,
        /// Dotted key
        key: String,
    },
    /// Check whether a key holds a value.
    KvExists {
        /// Target scope
        scope: ScopeHandle,
        /// Dotted key
        key: String,
    },
    /// List live keys under a prefix.
    KvList {
        /// Target scope
        scope: ScopeHandle,
        /// Key prefix; all keys when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },

    // =========================================================================
    // Vectors (3)
    // =========================================================================
    /// Insert or replace an embedding.
    VectorSet {
        /// Target scope
        scope: ScopeHandle,
        /// Vector key
        key: String,
        /// Embedding
        embedding: Vec<f32>,
        /// Metadata returned with search hits
        #[serde(default)]
        metadata: VectorMetadata,
    },
    /// Remove an embedding.
    VectorDelete {
        /// Target scope
        scope: ScopeHandle,
        /// Vector key
        key: String,
    },
    /// Nearest embeddings to a query.
    VectorSearch {
        /// Target scope
        scope: ScopeHandle,
        /// Query embedding
        query: Vec<f32>,
        /// Maximum number of hits
        top_k: usize,
    },

    // =========================================================================
    // History (1)
    // =========================================================================
    /// Most recent events visible to the caller, newest first.
    History {
        /// Only this scope
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<ScopeHandle>,
        /// Only scopes of this kind
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope_kind: Option<ScopeKind>,
        /// Only keys matching this pattern
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_pattern: Option<String>,
        /// Only this action
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<EventAction>,
        /// Only events at or after this time
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since: Option<DateTime<Utc>>,
        /// Maximum number of events (capped server-side)
        limit: usize,
    },

    // =========================================================================
    // Scopes and database (5)
    // =========================================================================
    /// Allow a workflow id to be used as a scope.
    WorkflowRegister {
        /// Workflow id
        workflow_id: String,
    },
    /// Liveness check.
    Ping,
    /// Counters snapshot.
    Stats,
    /// Flush the WAL.
    Flush,
    /// Active configuration.
    ConfigGet,
}

impl Command {
    /// Variant name, used in logs and unexpected-output errors.
    pub fn name(&self) -> &'static str {
        match self {
            Command::KvGet { .. } => "KvGet",
            Command::KvSet { .. } => "KvSet",
            Command::KvDelete { .. } => "KvDelete",
            Command::KvExists { .. } => "KvExists",
            Command::KvList { .. } => "KvList",
            Command::VectorSet { .. } => "VectorSet",
            Command::VectorDelete { .. } => "VectorDelete",
            Command::VectorSearch { .. } => "VectorSearch",
            Command::History { .. } => "History",
            Command::WorkflowRegister { .. } => "WorkflowRegister",
            Command::Ping => "Ping",
            Command::Stats => "Stats",
            Command::Flush => "Flush",
            Command::ConfigGet => "ConfigGet",
        }
    }

    /// Whether the command mutates state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::KvSet { .. }
                | Command::KvDelete { .. }
                | Command::VectorSet { .. }
                | Command::VectorDelete { .. }
                | Command::WorkflowRegister { .. }
        )
    }
}
