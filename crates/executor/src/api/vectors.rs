//! Vector power API.
//!
//! Access via `client.vectors()`.

use fabric_core::{ScopeHandle, VectorMetadata};
use fabric_engine::VectorHit;
use fabric_security::CallerContext;

use crate::{Command, Error, Executor, Output, Result};

/// Handle for vector operations.
///
/// Obtained via [`FabricClient::vectors()`](super::FabricClient::vectors).
pub struct Vectors<'a> {
    executor: &'a Executor,
    caller: &'a CallerContext,
}

impl<'a> Vectors<'a> {
    pub(crate) fn new(executor: &'a Executor, caller: &'a CallerContext) -> Self {
        Self { executor, caller }
    }

    /// Insert or replace an embedding.
    pub fn set(
        &self,
        scope: &ScopeHandle,
        key: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Result<()> {
        match self.executor.execute(
            self.caller,
            Command::VectorSet {
                scope: scope.clone(),
                key: key.to_string(),
                embedding,
                metadata,
            },
        )? {
            Output::Unit => Ok(()),
            _ => Err(Error::unexpected_output("VectorSet")),
        }
    }

    /// Remove an embedding. Returns whether it existed.
    pub fn delete(&self, scope: &ScopeHandle, key: &str) -> Result<bool> {
        match self.executor.execute(
            self.caller,
            Command::VectorDelete {
                scope: scope.clone(),
                key: key.to_string(),
            },
        )? {
            Output::Bool(existed) => Ok(existed),
            _ => Err(Error::unexpected_output("VectorDelete")),
        }
    }

    /// Up to `top_k` nearest embeddings, best first.
    pub fn search(&self, scope: &ScopeHandle, query: Vec<f32>, top_k: usize) -> Result<Vec<VectorHit>> {
        match self.executor.execute(
            self.caller,
            Command::VectorSearch {
                scope: scope.clone(),
                query,
                top_k,
            },
        )? {
            Output::VectorHits(hits) => Ok(hits),
            _ => Err(Error::unexpected_output("VectorSearch")),
        }
    }
}
