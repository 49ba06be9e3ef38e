//! Caller identity and scope authorization

use crate::AccessMode;
use fabric_core::{EventMetadata, FabricError, FabricResult, ScopeHandle, ScopeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of access being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reads, searches, history
    Read,
    /// Sets, deletes, vector writes
    Write,
}

/// Identity injected by the orchestration layer on every request.
///
/// `agent_id`, `workflow_id` and `execution_id` are copied into the
/// metadata of events the caller produces. `actor_id` decides which actor
/// scope the caller may touch. `workflow_id`, `session_id` and `actor_id`
/// together pick the scopes a layered read walks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Agent (node) making the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Actor the caller acts for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Session the call belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Workflow the call belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Execution the call belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    /// Extra fields forwarded into event metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
    /// Bypasses actor ownership checks (recovery, administration)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,
}

impl CallerContext {
    /// Anonymous caller with no identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Privileged internal caller.
    pub fn system() -> Self {
        Self {
            agent_id: Some("system".to_string()),
            privileged: true,
            ..Self::default()
        }
    }

    /// Caller identified by agent id.
    pub fn agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }

    /// Set the actor.
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Set the session.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the workflow.
    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Set the execution.
    pub fn with_execution(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    /// Add an extra metadata field.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether this caller may see `scope` at all.
    ///
    /// Actor scopes are private to their actor; everything else is shared.
    pub fn can_access(&self, scope: &ScopeHandle) -> bool {
        match scope.kind() {
            ScopeKind::Actor => self.privileged || self.actor_id.as_deref() == scope.id(),
            _ => true,
        }
    }

    /// Event metadata carrying this caller's identity.
    pub fn event_metadata(&self) -> EventMetadata {
        EventMetadata {
            agent_id: self.agent_id.clone(),
            workflow_id: self.workflow_id.clone(),
            execution_id: self.execution_id.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// Check that `caller` may perform `op` on `scope` under `mode`.
pub fn authorize(
    mode: AccessMode,
    caller: &CallerContext,
    scope: &ScopeHandle,
    op: Operation,
) -> FabricResult<()> {
    if op == Operation::Write && mode.is_read_only() {
        return Err(FabricError::access_denied(scope, "fabric is open read-only"));
    }
    if !caller.can_access(scope) {
        return Err(FabricError::access_denied(
            scope,
            match &caller.actor_id {
                Some(actor) => format!("actor scope belongs to another actor (caller is '{}')", actor),
                None => "actor scope requires a caller actor_id".to_string(),
            },
        ));
    }
    Ok(())
}
