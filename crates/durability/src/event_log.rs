//! Sequenced, append-only event log
//!
//! Each scope partition has its own history and its own sequence counter.
//! Every appended record also gets a global log sequence number (lsn),
//! which orders events across partitions for history queries and is the
//! order frames appear in the WAL.
//!
//! # Design
//!
//! - Sequence assignment happens under the partition mutex; the WAL write
//!   happens under the writer mutex, taken while the partition mutex is
//!   held. Lock order is always partition, then writer.
//! - A sequence is consumed only when the WAL accepted the frame, so a
//!   failed append leaves no gap and no in-memory trace.
//! - Events are shared as `Arc<ChangeEvent>` with the dispatcher.

use crate::wal::{DurabilityMode, WalError, WalRecord, WalWriter};
use dashmap::DashMap;
use fabric_core::{ChangeEvent, PartitionId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An event together with its log positions.
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    /// Global log sequence number
    pub lsn: u64,
    /// Partition the event belongs to
    pub partition: PartitionId,
    /// The immutable event
    pub event: Arc<ChangeEvent>,
}

#[derive(Default)]
struct PartitionLog {
    events: Vec<LoggedEvent>,
    last_sequence: u64,
}

/// Per-partition event history backed by an optional WAL.
pub struct EventLog {
    partitions: DashMap<PartitionId, Arc<Mutex<PartitionLog>>>,
    writer: Option<Mutex<WalWriter>>,
    next_lsn: AtomicU64,
    mode: DurabilityMode,
}

impl EventLog {
    /// History kept in memory only.
    pub fn in_memory() -> Self {
        Self {
            partitions: DashMap::new(),
            writer: None,
            next_lsn: AtomicU64::new(1),
            mode: DurabilityMode::InMemory,
        }
    }

    /// History persisted through `writer`.
    pub fn with_writer(writer: WalWriter, mode: DurabilityMode) -> Self {
        Self {
            partitions: DashMap::new(),
            writer: Some(Mutex::new(writer)),
            next_lsn: AtomicU64::new(1),
            mode,
        }
    }

    /// Durability mode this log runs in.
    pub fn mode(&self) -> DurabilityMode {
        self.mode
    }

    fn partition_log(&self, partition: PartitionId) -> Arc<Mutex<PartitionLog>> {
        self.partitions
            .entry(partition)
            .or_default()
            .value()
            .clone()
    }

    /// Append a change event to `partition`.
    ///
    /// `build` receives the assigned sequence and returns the event to
    /// log. On error nothing is recorded and the sequence is not consumed.
    pub fn append_change<F>(&self, partition: PartitionId, build: F) -> Result<LoggedEvent, WalError>
    where
        F: FnOnce(u64) -> ChangeEvent,
    {
        let log = self.partition_log(partition);
        let mut log = log.lock();

        let sequence = log.last_sequence + 1;
        let event = Arc::new(build(sequence));
        debug_assert_eq!(event.sequence, sequence);

        let lsn = match &self.writer {
            None => self.next_lsn.fetch_add(1, Ordering::SeqCst),
            Some(writer) => {
                let mut writer = writer.lock();
                let lsn = self.next_lsn.load(Ordering::SeqCst);
                writer.append(&WalRecord::Change {
                    lsn,
                    event: (*event).clone(),
                })?;
                self.next_lsn.store(lsn + 1, Ordering::SeqCst);
                lsn
            }
        };

        let logged = LoggedEvent {
            lsn,
            partition,
            event,
        };
        log.last_sequence = sequence;
        log.events.push(logged.clone());
        Ok(logged)
    }

    /// Append a non-event record (vector mutations). Returns its lsn.
    ///
    /// Without a WAL the builder is never called.
    pub fn append_record<F>(&self, build: F) -> Result<u64, WalError>
    where
        F: FnOnce(u64) -> WalRecord,
    {
        match &self.writer {
            None => Ok(self.next_lsn.fetch_add(1, Ordering::SeqCst)),
            Some(writer) => {
                let mut writer = writer.lock();
                let lsn = self.next_lsn.load(Ordering::SeqCst);
                writer.append(&build(lsn))?;
                self.next_lsn.store(lsn + 1, Ordering::SeqCst);
                Ok(lsn)
            }
        }
    }

    /// Re-insert an event read back from the WAL. Does not write.
    pub fn restore_change(&self, partition: PartitionId, lsn: u64, event: ChangeEvent) {
        let log = self.partition_log(partition);
        let mut log = log.lock();
        log.last_sequence = log.last_sequence.max(event.sequence);
        log.events.push(LoggedEvent {
            lsn,
            partition,
            event: Arc::new(event),
        });
        drop(log);
        self.observe_lsn(lsn);
    }

    /// Make sure future lsns come after `lsn`.
    pub fn observe_lsn(&self, lsn: u64) {
        self.next_lsn.fetch_max(lsn + 1, Ordering::SeqCst);
    }

    /// Last lsn handed out (0 when empty).
    pub fn last_lsn(&self) -> u64 {
        self.next_lsn.load(Ordering::SeqCst) - 1
    }

    /// Highest sequence assigned in `partition` (0 when empty).
    pub fn latest_sequence(&self, partition: PartitionId) -> u64 {
        self.partitions
            .get(&partition)
            .map(|log| log.lock().last_sequence)
            .unwrap_or(0)
    }

    /// Events of `partition` with sequence greater than `after`, ascending.
    pub fn events_after(&self, partition: PartitionId, after: u64, limit: usize) -> Vec<LoggedEvent> {
        let Some(log) = self.partitions.get(&partition).map(|l| l.value().clone()) else {
            return Vec::new();
        };
        let log = log.lock();
        let start = log.events.partition_point(|e| e.event.sequence <= after);
        log.events[start..].iter().take(limit).cloned().collect()
    }

    /// Up to `limit` newest events across `partitions` that pass `filter`,
    /// newest first by lsn.
    pub fn recent<F>(&self, partitions: &[PartitionId], limit: usize, filter: F) -> Vec<LoggedEvent>
    where
        F: Fn(&ChangeEvent) -> bool,
    {
        if limit == 0 {
            return Vec::new();
        }

        let mut merged = Vec::new();
        for partition in partitions {
            let Some(log) = self.partitions.get(partition).map(|l| l.value().clone()) else {
                continue;
            };
            let log = log.lock();
            merged.extend(
                log.events
                    .iter()
                    .rev()
                    .filter(|e| filter(&e.event))
                    .take(limit)
                    .cloned(),
            );
        }

        merged.sort_unstable_by(|a, b| b.lsn.cmp(&a.lsn));
        merged.truncate(limit);
        merged
    }

    /// Partitions that have at least one event.
    pub fn partitions(&self) -> Vec<PartitionId> {
        let mut ids: Vec<PartitionId> = self.partitions.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Events held across all partitions.
    pub fn total_events(&self) -> usize {
        self.partitions
            .iter()
            .map(|e| e.value().lock().events.len())
            .sum()
    }

    /// Flush and sync the WAL. No-op without one.
    pub fn flush(&self) -> Result<(), WalError> {
        match &self.writer {
            Some(writer) => writer.lock().flush(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("mode", &self.mode)
            .field("partitions", &self.partitions.len())
            .field("last_lsn", &self.last_lsn())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{WalReader, WAL_FILE_NAME};
    use chrono::Utc;
    use fabric_core::{EventAction, EventMetadata, ScopeKind, Value};
    use std::thread;
    use tempfile::tempdir;
    use uuid::Uuid;

    const P0: PartitionId = PartitionId::new(0);
    const P1: PartitionId = PartitionId::new(1);

    fn event(key: &str, value: i64) -> impl FnOnce(u64) -> ChangeEvent {
        let key = key.to_string();
        move |sequence| ChangeEvent {
            id: Uuid::new_v4(),
            scope: ScopeKind::Global,
            scope_id: None,
            key,
            action: EventAction::Set,
            data: Some(Value::from(value)),
            previous_data: None,
            metadata: EventMetadata::default(),
            sequence,
            timestamp: Utc::now(),
        }
    }

    // ========================================================================
    // Sequencing
    // ========================================================================

    #[test]
    fn test_sequences_are_per_partition() {
        let log = EventLog::in_memory();
        let a = log.append_change(P0, event("a", 1)).unwrap();
        let b = log.append_change(P0, event("a", 2)).unwrap();
        let c = log.append_change(P1, event("a", 3)).unwrap();

        assert_eq!(a.event.sequence, 1);
        assert_eq!(b.event.sequence, 2);
        assert_eq!(c.event.sequence, 1);
        assert!(a.lsn < b.lsn && b.lsn < c.lsn);
        assert_eq!(log.latest_sequence(P0), 2);
        assert_eq!(log.latest_sequence(PartitionId::new(9)), 0);
    }

    #[test]
    fn test_concurrent_appends_have_no_gaps() {
        let log = Arc::new(EventLog::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..100 {
                        log.append_change(P0, event("k", t * 100 + i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let events = log.events_after(P0, 0, usize::MAX);
        let sequences: Vec<u64> = events.iter().map(|e| e.event.sequence).collect();
        assert_eq!(sequences, (1..=800).collect::<Vec<_>>());
        // lsn order agrees with sequence order inside a partition
        assert!(events.windows(2).all(|w| w[0].lsn < w[1].lsn));
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[test]
    fn test_events_after() {
        let log = EventLog::in_memory();
        for i in 0..5 {
            log.append_change(P0, event("k", i)).unwrap();
        }
        let tail = log.events_after(P0, 3, 10);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].event.sequence, 4);
        assert_eq!(log.events_after(P0, 0, 2).len(), 2);
        assert!(log.events_after(P1, 0, 10).is_empty());
    }

    #[test]
    fn test_recent_merges_newest_first() {
        let log = EventLog::in_memory();
        for i in 0..3 {
            log.append_change(P0, event("a", i)).unwrap();
            log.append_change(P1, event("b", i)).unwrap();
        }

        let recent = log.recent(&[P0, P1], 4, |_| true);
        assert_eq!(recent.len(), 4);
        assert!(recent.windows(2).all(|w| w[0].lsn > w[1].lsn));
        assert_eq!(recent[0].event.key, "b");

        let only_a = log.recent(&[P0, P1], 10, |e| e.key == "a");
        assert_eq!(only_a.len(), 3);
        assert!(log.recent(&[P0], 0, |_| true).is_empty());
        assert_eq!(log.total_events(), 6);
        assert_eq!(log.partitions(), vec![P0, P1]);
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    #[test]
    fn test_wal_backed_log_writes_in_lsn_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(WAL_FILE_NAME);
        {
            let writer = WalWriter::open(&path, DurabilityMode::Buffered).unwrap();
            let log = EventLog::with_writer(writer, DurabilityMode::Buffered);
            log.append_change(P0, event("a", 1)).unwrap();
            let lsn = log
                .append_record(|lsn| WalRecord::VectorDelete {
                    lsn,
                    scope: fabric_core::ScopeHandle::global(),
                    key: "v".into(),
                })
                .unwrap();
            assert_eq!(lsn, 2);
            log.append_change(P1, event("b", 2)).unwrap();
            log.flush().unwrap();
        }

        let read = WalReader::read_all(&path).unwrap();
        let lsns: Vec<u64> = read.records.iter().map(|(_, r)| r.lsn()).collect();
        assert_eq!(lsns, vec![1, 2, 3]);
    }

    #[test]
    fn test_restore_continues_sequences() {
        let log = EventLog::in_memory();
        let mut restored = event("k", 1)(4);
        restored.sequence = 4;
        log.restore_change(P0, 10, restored);

        assert_eq!(log.latest_sequence(P0), 4);
        assert_eq!(log.last_lsn(), 10);

        let next = log.append_change(P0, event("k", 2)).unwrap();
        assert_eq!(next.event.sequence, 5);
        assert_eq!(next.lsn, 11);
    }

    #[test]
    fn test_in_memory_record_skips_builder() {
        let log = EventLog::in_memory();
        let lsn = log
            .append_record(|_| panic!("builder must not run without a WAL"))
            .unwrap();
        assert_eq!(lsn, 1);
        assert_eq!(log.mode(), DurabilityMode::InMemory);
    }
}
