//! Scope registry
//!
//! Maps scope handles to dense partition ids. Global, session and actor
//! partitions are created on first use; workflow partitions additionally
//! require the workflow to have been registered by the orchestration layer.

use dashmap::DashMap;
use fabric_core::{FabricError, FabricResult, PartitionId, ScopeHandle, ScopeKind};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

/// Scope handle to partition mapping.
#[derive(Default)]
pub struct ScopeRegistry {
    partitions: DashMap<ScopeHandle, PartitionId>,
    // index is the partition id
    handles: RwLock<Vec<ScopeHandle>>,
    workflows: RwLock<FxHashSet<String>>,
}

impl ScopeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow partitions for workflow `id`. Returns false if already known.
    pub fn register_workflow(&self, id: impl Into<String>) -> bool {
        let id = id.into();
        let added = self.workflows.write().insert(id.clone());
        if added {
            tracing::debug!(target: "fabric::scope", workflow = %id, "Workflow registered");
        }
        added
    }

    /// Whether workflow `id` is registered.
    pub fn is_registered(&self, id: &str) -> bool {
        self.workflows.read().contains(id)
    }

    fn check(&self, handle: &ScopeHandle) -> FabricResult<()> {
        handle.validate()?;
        if handle.kind() == ScopeKind::Workflow {
            let id = handle.id().unwrap_or_default();
            if !self.is_registered(id) {
                return Err(FabricError::scope_not_found(handle));
            }
        }
        Ok(())
    }

    /// Partition for `handle`, creating it if needed.
    pub fn resolve(&self, handle: &ScopeHandle) -> FabricResult<PartitionId> {
        self.check(handle)?;
        if let Some(id) = self.partitions.get(handle) {
            return Ok(*id);
        }

        let id = *self
            .partitions
            .entry(handle.clone())
            .or_insert_with(|| {
                let mut handles = self.handles.write();
                let id = PartitionId::new(handles.len() as u32);
                handles.push(handle.clone());
                tracing::debug!(target: "fabric::scope", scope = %handle, partition = %id, "Partition created");
                id
            });
        Ok(id)
    }

    /// Partition for `handle` if it exists; never creates one.
    pub fn lookup(&self, handle: &ScopeHandle) -> FabricResult<Option<PartitionId>> {
        self.check(handle)?;
        Ok(self.partitions.get(handle).map(|id| *id))
    }

    /// Reverse lookup.
    pub fn handle(&self, id: PartitionId) -> Option<ScopeHandle> {
        self.handles.read().get(id.as_u32() as usize).cloned()
    }

    /// Every partition with its handle, in creation order.
    pub fn partitions(&self) -> Vec<(PartitionId, ScopeHandle)> {
        self.handles
            .read()
            .iter()
            .enumerate()
            .map(|(i, h)| (PartitionId::new(i as u32), h.clone()))
            .collect()
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    /// True when no partition exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("partitions", &self.len())
            .field("workflows", &self.workflows.read().len())
            .finish()
    }
}
