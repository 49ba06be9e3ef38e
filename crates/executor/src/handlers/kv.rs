//! KV command handlers.

use std::sync::Arc;

use fabric_core::{ScopeHandle, Value};
use fabric_engine::Fabric;
use fabric_security::CallerContext;

use crate::convert::convert_result;
use crate::{Output, Result};

/// Handle KvGet command.
pub fn kv_get(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    scope: ScopeHandle,
    key: String,
    default: Option<Value>,
) -> Result<Output> {
    let kv = fabric.kv();
    match default {
        Some(default) => Ok(Output::Value(convert_result(
            kv.get_or(caller, &scope, &key, default),
        )?)),
        None => Ok(Output::Maybe(convert_result(kv.get(caller, &scope, &key))?)),
    }
}

/// Handle KvSet command.
pub fn kv_set(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    scope: ScopeHandle,
    key: String,
    value: Value,
) -> Result<Output> {
    let event = convert_result(fabric.kv().set(caller, &scope, &key, value))?;
    Ok(Output::Event(event))
}

/// Handle KvDelete command.
pub fn kv_delete(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    scope: ScopeHandle,
    key: String,
) -> Result<Output> {
    let event = convert_result(fabric.kv().delete(caller, &scope, &key))?;
    Ok(Output::Event(event))
}

/// Handle KvExists command.
pub fn kv_exists(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    scope: ScopeHandle,
    key: String,
) -> Result<Output> {
    let exists = convert_result(fabric.kv().exists(caller, &scope, &key))?;
    Ok(Output::Bool(exists))
}

/// Handle KvList command.
pub fn kv_list(
    fabric: &Arc<Fabric>,
    caller: &CallerContext,
    scope: ScopeHandle,
    prefix: Option<String>,
) -> Result<Output> {
    let keys = convert_result(fabric.kv().list_keys(
        caller,
        &scope,
        prefix.as_deref().unwrap_or(""),
    ))?;
    Ok(Output::Keys(keys))
}
