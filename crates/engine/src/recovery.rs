//! WAL replay
//!
//! Rebuilds the in-memory state of a fabric from the records read back at
//! open: the scope registry, the sharded store, per-partition histories and
//! sequence counters, and the vector indexes.
//!
//! # Design
//!
//! - Records are applied in WAL order, which is lsn order.
//! - Partition ids are assigned afresh; every record carries its scope
//!   handle and is re-resolved.
//! - Workflow scopes found in the log are re-registered: they were valid
//!   when written.
//! - Vector records that no longer apply (dimension conflict) are skipped
//!   with a warning rather than failing the open.

use crate::database::Fabric;
use fabric_core::{
    EventAction, FabricResult, PartitionId, ScopeHandle, ScopeKind, Value, VectorRecord,
    VersionedValue,
};
use fabric_durability::WalRecord;

/// What a replay applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records read
    pub records: usize,
    /// KV change events restored
    pub changes: usize,
    /// Vector puts and deletes applied
    pub vector_ops: usize,
    /// Workflow scopes re-registered
    pub workflows: usize,
}

fn resolve_logged(
    fabric: &Fabric,
    scope: &ScopeHandle,
    report: &mut RecoveryReport,
) -> FabricResult<PartitionId> {
    if scope.kind() == ScopeKind::Workflow {
        if let Some(id) = scope.id() {
            if fabric.scopes.register_workflow(id) {
                report.workflows += 1;
            }
        }
    }
    fabric.scopes.resolve(scope)
}

/// Apply `records` (offset, record) to a freshly assembled fabric.
pub(crate) fn replay(fabric: &Fabric, records: Vec<(u64, WalRecord)>) -> FabricResult<RecoveryReport> {
    let mut report = RecoveryReport {
        records: records.len(),
        ..RecoveryReport::default()
    };

    for (offset, record) in records {
        match record {
            WalRecord::Change { lsn, event } => {
                let handle = event.scope_handle();
                let partition = resolve_logged(fabric, &handle, &mut report)?;

                match event.action {
                    EventAction::Set => {
                        let value = event.data.clone().unwrap_or_else(Value::null);
                        fabric.store.put(
                            partition,
                            event.key.clone(),
                            VersionedValue {
                                value,
                                version: event.sequence,
                                timestamp: event.timestamp,
                            },
                        );
                    }
                    EventAction::Delete => {
                        fabric.store.delete(partition, &event.key);
                    }
                }
                fabric.log.restore_change(partition, lsn, event);
                report.changes += 1;
            }
            WalRecord::VectorPut {
                lsn,
                scope,
                key,
                embedding,
                metadata,
                inserted_at,
            } => {
                let partition = resolve_logged(fabric, &scope, &mut report)?;
                let index = fabric.vector_index(partition);
                let applied = index.write().upsert(VectorRecord {
                    scope: scope.clone(),
                    key: key.clone(),
                    embedding,
                    metadata,
                    inserted_at,
                });
                if let Err(e) = applied {
                    tracing::warn!(
                        target: "fabric::recovery",
                        offset,
                        scope = %scope,
                        key = %key,
                        error = %e,
                        "Skipping vector record"
                    );
                }
                fabric.log.observe_lsn(lsn);
                report.vector_ops += 1;
            }
            WalRecord::VectorDelete { lsn, scope, key } => {
                let partition = resolve_logged(fabric, &scope, &mut report)?;
                if let Some(index) = fabric.existing_vector_index(partition) {
                    index.write().remove(&key);
                }
                fabric.log.observe_lsn(lsn);
                report.vector_ops += 1;
            }
        }
    }

    if report.records > 0 {
        tracing::debug!(
            target: "fabric::recovery",
            records = report.records,
            changes = report.changes,
            vector_ops = report.vector_ops,
            workflows = report.workflows,
            "Replay complete"
        );
    }
    Ok(report)
}
