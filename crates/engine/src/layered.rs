//! Context-resolved memory
//!
//! `LayeredMemory` reads a key through the scopes named by the caller's
//! context, most specific first: workflow, session, actor, global. The
//! first scope holding the key wins. A scope is skipped when the caller
//! carries no id for it, when its workflow is not registered, or when the
//! caller may not read it.
//!
//! Writes go to the most specific scope of the chain.

use crate::database::Fabric;
use fabric_core::{ChangeEvent, FabricResult, ScopeHandle, ScopeKind, Value};
use fabric_security::CallerContext;
use std::sync::Arc;

/// Memory of every scope the caller's context names.
#[derive(Clone)]
pub struct LayeredMemory {
    fabric: Arc<Fabric>,
    caller: CallerContext,
}

impl LayeredMemory {
    /// Bind `caller`.
    pub fn new(fabric: Arc<Fabric>, caller: CallerContext) -> Self {
        Self { fabric, caller }
    }

    /// Bound caller.
    pub fn caller(&self) -> &CallerContext {
        &self.caller
    }

    /// Scopes consulted by reads, most specific first. Always ends with global.
    pub fn chain(&self) -> Vec<ScopeHandle> {
        let caller = &self.caller;
        let candidates = [
            caller.workflow_id.clone().map(ScopeHandle::workflow),
            caller.session_id.clone().map(ScopeHandle::session),
            caller.actor_id.clone().map(ScopeHandle::actor),
        ];

        let mut chain: Vec<ScopeHandle> = candidates
            .into_iter()
            .flatten()
            .filter(|scope| self.usable(scope))
            .collect();
        chain.push(ScopeHandle::global());
        chain
    }

    fn usable(&self, scope: &ScopeHandle) -> bool {
        if scope.validate().is_err() || !self.caller.can_access(scope) {
            return false;
        }
        match (scope.kind(), scope.id()) {
            (ScopeKind::Workflow, Some(id)) => self.fabric.is_workflow_registered(id),
            _ => true,
        }
    }

    /// Scope the first match was found in, with its value.
    pub fn resolve(&self, key: &str) -> FabricResult<Option<(ScopeHandle, Value)>> {
        let kv = self.fabric.kv();
        for scope in self.chain() {
            if let Some(value) = kv.get(&self.caller, &scope, key)? {
                tracing::trace!(target: "fabric::memory", key, scope = %scope, "Layered read hit");
                return Ok(Some((scope, value)));
            }
        }
        Ok(None)
    }

    /// Value from the most specific scope holding `key`.
    pub fn get(&self, key: &str) -> FabricResult<Option<Value>> {
        Ok(self.resolve(key)?.map(|(_, value)| value))
    }

    /// Like [`get`](Self::get), with a default for a key no scope holds.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> FabricResult<Value> {
        Ok(self.get(key)?.unwrap_or_else(|| default.into()))
    }

    /// Whether any scope of the chain holds `key`.
    pub fn exists(&self, key: &str) -> FabricResult<bool> {
        Ok(self.resolve(key)?.is_some())
    }

    /// Most specific scope of the chain; the target of writes.
    pub fn write_scope(&self) -> ScopeHandle {
        self.chain()
            .into_iter()
            .next()
            .unwrap_or_else(ScopeHandle::global)
    }

    /// Set `key` in [`write_scope`](Self::write_scope).
    pub fn set(&self, key: &str, value: impl Into<Value>) -> FabricResult<Arc<ChangeEvent>> {
        self.fabric
            .kv()
            .set(&self.caller, &self.write_scope(), key, value)
    }

    /// Delete `key` from [`write_scope`](Self::write_scope) only.
    pub fn delete(&self, key: &str) -> FabricResult<Arc<ChangeEvent>> {
        self.fabric
            .kv()
            .delete(&self.caller, &self.write_scope(), key)
    }
}

impl std::fmt::Debug for LayeredMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredMemory")
            .field("agent_id", &self.caller.agent_id)
            .field("chain", &self.chain())
            .finish()
    }
}
