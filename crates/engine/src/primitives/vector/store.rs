//! VectorStore facade
//!
//! # Design
//!
//! Like `KvStore`, a stateless handle over `Arc<Fabric>`. Writes take the
//! `(partition, key)` stripe lock, then the scope's index write lock, and
//! check the dimension before anything is logged, so a rejected embedding
//! never reaches the WAL. Vector mutations are logged for recovery but
//! produce no `ChangeEvent` and are not dispatched.

use super::VectorHit;
use crate::database::Fabric;
use chrono::Utc;
use fabric_core::{
    validate_key, FabricError, FabricResult, ScopeHandle, VectorMetadata, VectorRecord,
};
use fabric_durability::WalRecord;
use fabric_security::{CallerContext, Operation};
use std::sync::Arc;

/// Vector store primitive.
#[derive(Clone)]
pub struct VectorStore {
    fabric: Arc<Fabric>,
}

impl VectorStore {
    /// Create a new vector facade.
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }

    /// Store or replace the embedding under `key`.
    ///
    /// Fails with `VectorDimensionMismatch` when the scope already holds
    /// vectors of another dimension, and with `InvalidInput` for an empty
    /// embedding or one containing NaN or infinity.
    pub fn set_vector(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> FabricResult<()> {
        let fabric = &self.fabric;
        fabric.authorize(caller, scope, Operation::Write)?;
        validate_key(key)?;
        validate_embedding(&embedding)?;
        let partition = fabric.scopes.resolve(scope)?;

        let _guard = fabric.locks.lock(partition, key);
        let index = fabric.vector_index(partition);
        let mut index = index.write();
        index.check_dimension(embedding.len())?;

        let inserted_at = index
            .get(key)
            .map(|existing| existing.inserted_at)
            .unwrap_or_else(Utc::now);

        let lsn = fabric.log.append_record(|lsn| WalRecord::VectorPut {
            lsn,
            scope: scope.clone(),
            key: key.to_string(),
            embedding: embedding.clone(),
            metadata: metadata.clone(),
            inserted_at,
        })?;

        let dimension = embedding.len();
        let replaced = index.upsert(VectorRecord {
            scope: scope.clone(),
            key: key.to_string(),
            embedding,
            metadata,
            inserted_at,
        })?;

        tracing::trace!(
            target: "fabric::vector",
            scope = %scope,
            key,
            dimension,
            lsn,
            replaced = replaced.is_some(),
            "Vector stored"
        );
        Ok(())
    }

    /// Remove the vector under `key`. Returns whether one existed.
    pub fn delete_vector(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
    ) -> FabricResult<bool> {
        let fabric = &self.fabric;
        fabric.authorize(caller, scope, Operation::Write)?;
        validate_key(key)?;
        let Some(partition) = fabric.scopes.lookup(scope)? else {
            return Ok(false);
        };

        let _guard = fabric.locks.lock(partition, key);
        let Some(index) = fabric.existing_vector_index(partition) else {
            return Ok(false);
        };
        let mut index = index.write();
        if index.get(key).is_none() {
            return Ok(false);
        }

        fabric.log.append_record(|lsn| WalRecord::VectorDelete {
            lsn,
            scope: scope.clone(),
            key: key.to_string(),
        })?;
        index.remove(key);
        Ok(true)
    }

    /// The stored record for `key`.
    pub fn get_vector(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        key: &str,
    ) -> FabricResult<Option<VectorRecord>> {
        self.fabric.authorize(caller, scope, Operation::Read)?;
        validate_key(key)?;
        let Some(partition) = self.fabric.scopes.lookup(scope)? else {
            return Ok(None);
        };
        Ok(self
            .fabric
            .existing_vector_index(partition)
            .and_then(|index| index.read().get(key).cloned()))
    }

    /// Up to `top_k` vectors of `scope` most similar to `query`, best first.
    ///
    /// An empty scope yields no hits. A query whose dimension differs from
    /// the scope's vectors is an error.
    pub fn similarity_search(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        query: &[f32],
        top_k: usize,
    ) -> FabricResult<Vec<VectorHit>> {
        self.fabric.authorize(caller, scope, Operation::Read)?;
        validate_embedding(query)?;
        let Some(partition) = self.fabric.scopes.lookup(scope)? else {
            return Ok(Vec::new());
        };
        let Some(index) = self.fabric.existing_vector_index(partition) else {
            return Ok(Vec::new());
        };

        let index = index.read();
        if index.is_empty() {
            return Ok(Vec::new());
        }
        index.check_dimension(query.len())?;
        Ok(index.search(query, top_k, self.fabric.config.vector_metric))
    }

    /// Number of vectors in `scope`.
    pub fn vector_count(&self, caller: &CallerContext, scope: &ScopeHandle) -> FabricResult<usize> {
        self.fabric.authorize(caller, scope, Operation::Read)?;
        Ok(self
            .fabric
            .scopes
            .lookup(scope)?
            .and_then(|p| self.fabric.existing_vector_index(p))
            .map(|index| index.read().len())
            .unwrap_or(0))
    }
}

fn validate_embedding(embedding: &[f32]) -> FabricResult<()> {
    if embedding.is_empty() {
        return Err(FabricError::invalid_input("embedding must not be empty"));
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(FabricError::invalid_input(
            "embedding must contain only finite values",
        ));
    }
    Ok(())
}
