//! The command executor.
//!
//! `Executor` is the single entry point for every [`Command`]. It is a
//! stateless dispatcher over an `Arc<Fabric>`: it routes each command to
//! its handler and returns an [`Output`] or an [`Error`](crate::Error).
//!
//! The caller context travels with each call rather than living in the
//! executor, so one executor serves every remote agent.

use std::sync::Arc;

use fabric_engine::{Fabric, HistoryFilter};
use fabric_security::CallerContext;

use crate::handlers;
use crate::{Command, Output, Result};

/// Routes commands to the fabric.
#[derive(Clone)]
pub struct Executor {
    fabric: Arc<Fabric>,
}

impl Executor {
    /// Create an executor over `fabric`.
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }

    /// The underlying fabric.
    pub fn fabric(&self) -> &Arc<Fabric> {
        &self.fabric
    }

    /// Run one command on behalf of `caller`.
    pub fn execute(&self, caller: &CallerContext, cmd: Command) -> Result<Output> {
        let name = cmd.name();
        let result = self.dispatch(caller, cmd);
        if let Err(ref e) = result {
            if e.is_client_error() {
                tracing::debug!(target: "fabric::executor", command = name, error = %e, "Command rejected");
            } else {
                tracing::warn!(target: "fabric::executor", command = name, error = %e, "Command failed");
            }
        }
        result
    }

    /// Run commands in order. A failing command does not stop later ones.
    pub fn execute_many(
        &self,
        caller: &CallerContext,
        cmds: impl IntoIterator<Item = Command>,
    ) -> Vec<Result<Output>> {
        cmds.into_iter().map(|cmd| self.execute(caller, cmd)).collect()
    }

    fn dispatch(&self, caller: &CallerContext, cmd: Command) -> Result<Output> {
        let f = &self.fabric;
        match cmd {
            // KV
            Command::KvGet {
                scope,
                key,
                default,
            } => handlers::kv::kv_get(f, caller, scope, key, default),
            Command::KvSet { scope, key, value } => {
                handlers::kv::kv_set(f, caller, scope, key, value)
            }
            Command::KvDelete { scope, key } => handlers::kv::kv_delete(f, caller, scope, key),
            Command::KvExists { scope, key } => handlers::kv::kv_exists(f, caller, scope, key),
            Command::KvList { scope, prefix } => handlers::kv::kv_list(f, caller, scope, prefix),

            // Vectors
            Command::VectorSet {
                scope,
                key,
                embedding,
                metadata,
            } => handlers::vector::vector_set(f, caller, scope, key, embedding, metadata),
            Command::VectorDelete { scope, key } => {
                handlers::vector::vector_delete(f, caller, scope, key)
            }
            Command::VectorSearch {
                scope,
                query,
                top_k,
            } => handlers::vector::vector_search(f, caller, scope, query, top_k),

            // History
            Command::History {
                scope,
                scope_kind,
                key_pattern,
                action,
                since,
                limit,
            } => {
                let filter = HistoryFilter {
                    scope,
                    scope_kind,
                    key_pattern,
                    action,
                    since,
                };
                handlers::history::history(f, caller, filter, limit)
            }

            // Scopes and database
            Command::WorkflowRegister { workflow_id } => {
                handlers::db::workflow_register(f, workflow_id)
            }
            Command::Ping => handlers::db::ping(),
            Command::Stats => handlers::db::stats(f),
            Command::Flush => handlers::db::flush(f),
            Command::ConfigGet => handlers::db::config_get(f),
        }
    }
}
