//! Scope-bound memory handle
//!
//! `ScopedMemory` fixes the caller and the scope so agent code can write
//! `memory.set("prefs.theme", "dark")` without threading both through
//! every call. It is a thin wrapper: every operation goes through the same
//! `KvStore`/`VectorStore`/history paths as the unbound API.

use crate::database::Fabric;
use crate::primitives::{HistoryFilter, HistoryPage, KvStore, VectorHit, VectorStore};
use fabric_core::{ChangeEvent, FabricResult, ScopeHandle, Value, VectorMetadata};
use fabric_dispatch::{Binding, EventHandler, SubscriptionGuard};
use fabric_security::CallerContext;
use std::sync::Arc;

/// Memory of one scope, seen by one caller.
#[derive(Clone)]
pub struct ScopedMemory {
    fabric: Arc<Fabric>,
    caller: CallerContext,
    scope: ScopeHandle,
}

impl ScopedMemory {
    /// Bind `caller` to `scope`.
    pub fn new(fabric: Arc<Fabric>, caller: CallerContext, scope: ScopeHandle) -> Self {
        Self {
            fabric,
            caller,
            scope,
        }
    }

    /// Bound scope.
    pub fn scope(&self) -> &ScopeHandle {
        &self.scope
    }

    /// Bound caller.
    pub fn caller(&self) -> &CallerContext {
        &self.caller
    }

    fn kv(&self) -> KvStore {
        self.fabric.kv()
    }

    fn vectors(&self) -> VectorStore {
        self.fabric.vectors()
    }

    /// See [`KvStore::get`].
    pub fn get(&self, key: &str) -> FabricResult<Option<Value>> {
        self.kv().get(&self.caller, &self.scope, key)
    }

    /// See [`KvStore::get_or`].
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> FabricResult<Value> {
        self.kv().get_or(&self.caller, &self.scope, key, default)
    }

    /// See [`KvStore::exists`].
    pub fn exists(&self, key: &str) -> FabricResult<bool> {
        self.kv().exists(&self.caller, &self.scope, key)
    }

    /// See [`KvStore::set`].
    pub fn set(&self, key: &str, value: impl Into<Value>) -> FabricResult<Arc<ChangeEvent>> {
        self.kv().set(&self.caller, &self.scope, key, value)
    }

    /// See [`KvStore::delete`].
    pub fn delete(&self, key: &str) -> FabricResult<Arc<ChangeEvent>> {
        self.kv().delete(&self.caller, &self.scope, key)
    }

    /// See [`KvStore::list_keys`].
    pub fn list_keys(&self, prefix: &str) -> FabricResult<Vec<String>> {
        self.kv().list_keys(&self.caller, &self.scope, prefix)
    }

    /// See [`VectorStore::set_vector`].
    pub fn set_vector(
        &self,
        key: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> FabricResult<()> {
        self.vectors()
            .set_vector(&self.caller, &self.scope, key, embedding, metadata)
    }

    /// See [`VectorStore::similarity_search`].
    pub fn similarity_search(&self, query: &[f32], top_k: usize) -> FabricResult<Vec<VectorHit>> {
        self.vectors()
            .similarity_search(&self.caller, &self.scope, query, top_k)
    }

    /// Subscribe to changes in this scope only. Unsubscribes on drop.
    pub fn on_change<I, S>(&self, patterns: I, handler: impl EventHandler) -> FabricResult<SubscriptionGuard>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fabric.subscribe_guarded(
            &self.caller,
            patterns,
            Binding::ScopeInstance(self.scope.clone()),
            handler,
        )
    }

    /// Most recent events of this scope, newest first.
    pub fn history(&self, limit: usize) -> FabricResult<HistoryPage> {
        self.fabric.get_history(
            &self.caller,
            &HistoryFilter::new().scope(self.scope.clone()),
            limit,
        )
    }
}

impl std::fmt::Debug for ScopedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedMemory")
            .field("scope", &self.scope)
            .field("agent_id", &self.caller.agent_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core::FabricError;

    #[test]
    fn test_scoped_roundtrip() {
        let fabric = Fabric::ephemeral().unwrap();
        let memory = fabric.session(CallerContext::agent("a"), "u1");

        memory.set("prefs.theme", "dark").unwrap();
        assert_eq!(memory.get("prefs.theme").unwrap(), Some(Value::from("dark")));
        assert_eq!(memory.get_or("prefs.lang", "en").unwrap(), Value::from("en"));
        assert_eq!(memory.list_keys("prefs").unwrap(), vec!["prefs.theme"]);
        assert_eq!(memory.history(10).unwrap().len(), 1);

        memory.delete("prefs.theme").unwrap();
        assert!(!memory.exists("prefs.theme").unwrap());
    }

    #[test]
    fn test_actor_memory_requires_actor_id() {
        let fabric = Fabric::ephemeral().unwrap();
        assert!(fabric.actor(CallerContext::agent("a")).is_none());

        let memory = fabric
            .actor(CallerContext::agent("a").with_actor("alice"))
            .unwrap();
        assert_eq!(memory.scope(), &ScopeHandle::actor("alice"));
        memory.set("notes", "hi").unwrap();
    }

    #[test]
    fn test_workflow_memory_needs_registration() {
        let fabric = Fabric::ephemeral().unwrap();
        let memory = fabric.workflow(CallerContext::agent("a"), "wf-1");
        assert!(matches!(memory.set("k", 1i64), Err(FabricError::ScopeNotFound { .. })));

        fabric.register_workflow("wf-1");
        memory.set("k", 1i64).unwrap();
    }

    #[test]
    fn test_scoped_vectors() {
        let fabric = Fabric::ephemeral().unwrap();
        let memory = fabric.global(CallerContext::agent("a"));
        memory.set_vector("doc", vec![0.5, 0.5], VectorMetadata::new()).unwrap();
        let hits = memory.similarity_search(&[0.5, 0.5], 1).unwrap();
        assert_eq!(hits[0].key, "doc");
    }
}
