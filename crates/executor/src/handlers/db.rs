//! Scope registration, liveness, stats, flush and configuration handlers.

use std::sync::Arc;

use fabric_engine::Fabric;

use crate::convert::convert_result;
use crate::output::StatsInfo;
use crate::{Output, Result};

/// Handle WorkflowRegister command. Returns whether the id was new.
pub fn workflow_register(fabric: &Arc<Fabric>, workflow_id: String) -> Result<Output> {
    if workflow_id.is_empty() {
        return Err(crate::Error::InvalidInput {
            reason: "workflow id must not be empty".into(),
        });
    }
    Ok(Output::Bool(fabric.register_workflow(workflow_id)))
}

/// Handle Ping command.
pub fn ping() -> Result<Output> {
    Ok(Output::Pong {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle Stats command.
pub fn stats(fabric: &Arc<Fabric>) -> Result<Output> {
    let subscriptions = fabric.dispatcher().subscription_count();
    Ok(Output::Stats(StatsInfo::new(fabric.stats(), subscriptions)))
}

/// Handle Flush command.
pub fn flush(fabric: &Arc<Fabric>) -> Result<Output> {
    convert_result(fabric.flush())?;
    Ok(Output::Unit)
}

/// Handle ConfigGet command.
pub fn config_get(fabric: &Arc<Fabric>) -> Result<Output> {
    Ok(Output::Config(fabric.config().clone()))
}
