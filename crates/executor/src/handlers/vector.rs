//! Vector command handlers.

use std::sync::Arc;

use fabric_core::{ScopeHandle, VectorMetadata};
use fabric_engine::Fabric;
use fabric_security::CallerContext;

use crate::convert::convert_result;
use crate::{Output, Result};

/// Handle VectorSet command.
pub fn vector_set(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    scope: ScopeHandle,
    key: String,
    embedding: Vec<f32>,
    metadata: VectorMetadata,
) -> Result<Output> {
    convert_result(
        fabric
            .vectors()
            .set_vector(caller, &scope, &key, embedding, metadata),
    )?;
    Ok(Output::Unit)
}

/// Handle VectorDelete command.
pub fn vector_delete(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    scope: ScopeHandle,
    key: String,
) -> Result<Output> {
    let existed = convert_result(fabric.vectors().delete_vector(caller, &scope, &key))?;
    Ok(Output::Bool(existed))
}

/// Handle VectorSearch command.
pub fn vector_search(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    scope: ScopeHandle,
    query: Vec<f32>,
    top_k: usize,
) -> Result<Output> {
    let hits = convert_result(
        fabric
            .vectors()
            .similarity_search(caller, &scope, &query, top_k),
    )?;
    Ok(Output::VectorHits(hits))
}
