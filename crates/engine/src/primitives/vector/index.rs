//! Per-partition brute-force vector index
//!
//! Exact search: every stored vector is scored against the query. Ties are
//! broken by insertion rank, which an overwrite keeps, so results are fully
//! deterministic.

use super::distance::similarity;
use super::VectorHit;
use fabric_core::{DistanceMetric, FabricError, FabricResult, VectorRecord};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

struct Entry {
    rank: u64,
    record: VectorRecord,
}

/// Vectors of one scope.
#[derive(Default)]
pub struct VectorIndex {
    dimension: Option<usize>,
    entries: FxHashMap<String, Entry>,
    next_rank: u64,
}

impl VectorIndex {
    /// Empty index with no established dimension.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension shared by every stored vector, if any are stored.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fail unless an embedding of `len` fits this index.
    pub fn check_dimension(&self, len: usize) -> FabricResult<()> {
        match self.dimension {
            Some(expected) if expected != len => Err(FabricError::VectorDimensionMismatch {
                expected,
                got: len,
            }),
            _ => Ok(()),
        }
    }

    /// Existing record for `key`.
    pub fn get(&self, key: &str) -> Option<&VectorRecord> {
        self.entries.get(key).map(|e| &e.record)
    }

    /// Insert or replace. Returns the replaced record.
    pub fn upsert(&mut self, record: VectorRecord) -> FabricResult<Option<VectorRecord>> {
        self.check_dimension(record.embedding.len())?;
        self.dimension = Some(record.embedding.len());

        match self.entries.get_mut(&record.key) {
            Some(entry) => Ok(Some(std::mem::replace(&mut entry.record, record))),
            None => {
                let rank = self.next_rank;
                self.next_rank += 1;
                self.entries.insert(record.key.clone(), Entry { rank, record });
                Ok(None)
            }
        }
    }

    /// Remove `key`. The dimension resets once the index is empty.
    pub fn remove(&mut self, key: &str) -> Option<VectorRecord> {
        let removed = self.entries.remove(key).map(|e| e.record);
        if self.entries.is_empty() {
            self.dimension = None;
        }
        removed
    }

    /// The `k` most similar vectors, best first.
    pub fn search(&self, query: &[f32], k: usize, metric: DistanceMetric) -> Vec<VectorHit> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f32, &Entry)> = self
            .entries
            .values()
            .map(|e| (similarity(metric, query, &e.record.embedding), e))
            .collect();

        scored.sort_by(|(sa, ea), (sb, eb)| {
            sb.partial_cmp(sa)
                .unwrap_or(Ordering::Equal)
                .then(ea.rank.cmp(&eb.rank))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(score, e)| VectorHit {
                key: e.record.key.clone(),
                score,
                metadata: e.record.metadata.clone(),
            })
            .collect()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.rank);
        entries.into_iter().map(|e| e.record.key.clone()).collect()
    }
}
