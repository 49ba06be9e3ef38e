//! Key-Value Store primitive
//!
//! Stateless facade over the fabric. Shared structured state for agents:
//! preferences, progress markers, intermediate results.
//!
//! # Design
//!
//! KvStore holds only an `Arc<Fabric>`. Multiple instances sharing the same
//! fabric see the same data. Clone is cheap (just Arc clone).
//!
//! A write runs entirely under the stripe lock of its `(partition, key)`:
//! read the previous value, append the event (which assigns the sequence),
//! apply it to the store, queue it for dispatch. The event and the new
//! value commit together or not at all, and deliveries for one key are
//! queued in sequence order.
//!
//! Reads never take the key lock; they see either the old or the new value.
//!
//! # Example
//!
//! ```ignore
//! let fabric = Fabric::ephemeral()?;
//! let kv = fabric.kv();
//! let caller = CallerContext::agent("planner");
//! let scope = ScopeHandle::session("u1");
//!
//! kv.set(&caller, &scope, "prefs.theme", "dark")?;
//! assert_eq!(kv.get(&caller, &scope, "prefs.theme")?, Some(Value::from("dark")));
//! ```

use crate::database::Fabric;
use chrono::Utc;
use fabric_core::{
    validate_key, ChangeEvent, EventAction, FabricResult, MemoryRecord, PartitionId, ScopeHandle,
    Value, VersionedValue,
};
use fabric_security::{CallerContext, Operation};
use std::sync::Arc;
use uuid::Uuid;

/// Key-Value Store primitive.
#[derive(Clone)]
pub struct KvStore {
    fabric: Arc<Fabric>,
}

impl KvStore {
    /// Create a new KV facade.
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }

    fn read_partition(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
    ) -> FabricResult<Option<PartitionId>> {
        self.fabric.authorize(caller, scope, Operation::Read)?;
        validate_key(key)?;
        self.fabric.scopes.lookup(scope)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Current value, `None` when the key is absent.
    pub fn get(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
    ) -> FabricResult<Option<Value>> {
        Ok(self
            .read_partition(caller, scope, key)?
            .and_then(|p| self.fabric.store.get(p, key))
            .map(|v| v.value))
    }

    /// Current value, or `default` when the key is absent.
    pub fn get_or(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
        default: impl Into<Value>,
    ) -> FabricResult<Value> {
        Ok(self
            .get(caller, scope, key)?
            .unwrap_or_else(|| default.into()))
    }

    /// Whether the key holds a value.
    pub fn exists(&self, caller: &CallerContext, scope: &ScopeHandle, key: &str) -> FabricResult<bool> {
        Ok(self
            .read_partition(caller, scope, key)?
            .map(|p| self.fabric.store.contains(p, key))
            .unwrap_or(false))
    }

    /// Value with its version and last write time.
    pub fn get_record(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
    ) -> FabricResult<Option<MemoryRecord>> {
        Ok(self
            .read_partition(caller, scope, key)?
            .and_then(|p| self.fabric.store.get(p, key))
            .map(|v| MemoryRecord {
                scope: scope.clone(),
                key: key.to_string(),
                value: v.value,
                version: v.version,
                updated_at: v.timestamp,
            }))
    }

    /// Live keys starting with `prefix`, sorted. An empty prefix lists all.
    pub fn list_keys(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        prefix: &str,
    ) -> FabricResult<Vec<String>> {
        self.fabric.authorize(caller, scope, Operation::Read)?;
        Ok(self
            .fabric
            .scopes
            .lookup(scope)?
            .map(|p| self.fabric.store.keys_with_prefix(p, prefix))
            .unwrap_or_default())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store `value` under `key` and return the resulting event.
    pub fn set(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
        value: impl Into<Value>,
    ) -> FabricResult<Arc<ChangeEvent>> {
        self.mutate(caller, scope, key, Some(value.into()))
    }

    /// Remove `key` and return the resulting event.
    ///
    /// Deleting an absent key still records an event, with no previous data.
    pub fn delete(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
    ) -> FabricResult<Arc<ChangeEvent>> {
        self.mutate(caller, scope, key, None)
    }

    fn mutate(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
        value: Option<Value>,
    ) -> FabricResult<Arc<ChangeEvent>> {
        let fabric = &self.fabric;
        fabric.authorize(caller, scope, Operation::Write)?;
        validate_key(key)?;
        let partition = fabric.scopes.resolve(scope)?;

        let _guard = fabric.locks.lock(partition, key);

        let previous = fabric.store.get(partition, key).map(|v| v.value);
        let action = if value.is_some() {
            EventAction::Set
        } else {
            EventAction::Delete
        };
        let timestamp = Utc::now();

        let logged = fabric.log.append_change(partition, |sequence| ChangeEvent {
            id: Uuid::new_v4(),
            scope: scope.kind(),
            scope_id: scope.id().map(str::to_string),
            key: key.to_string(),
            action,
            data: value.clone(),
            previous_data: previous,
            metadata: caller.event_metadata(),
            sequence,
            timestamp,
        })?;

        match value {
            Some(value) => {
                fabric.store.put(
                    partition,
                    key.to_string(),
                    VersionedValue {
                        value,
                        version: logged.event.sequence,
                        timestamp,
                    },
                );
            }
            None => {
                fabric.store.delete(partition, key);
            }
        }

        let queued = fabric.dispatcher.publish(partition, &logged.event);
        tracing::trace!(
            target: "fabric::kv",
            scope = %scope,
            key,
            action = %action,
            sequence = logged.event.sequence,
            queued,
            "Committed"
        );

        Ok(logged.event)
    }
}
