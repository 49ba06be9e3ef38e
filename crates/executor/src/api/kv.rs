//! KV and history operations.

use std::sync::Arc;

use fabric_core::{ChangeEvent, EventAction, ScopeHandle, Value};
use fabric_engine::{HistoryFilter, HistoryPage};

use super::FabricClient;
use crate::{Command, Error, Output, Result};

impl FabricClient {
    // =========================================================================
    // KV Operations (6)
    // =========================================================================

    /// Read a key.
    pub fn kv_get(&self, scope: &ScopeHandle, key: &str) -> Result<Option<Value>> {
        match self.executor.execute(
            &self.caller,
            Command::KvGet {
                scope: scope.clone(),
                key: key.to_string(),
                default: None,
            },
        )? {
            Output::Maybe(value) => Ok(value),
            _ => Err(Error::unexpected_output("KvGet")),
        }
    }

    /// Read a key, falling back to `default`.
    pub fn kv_get_or(
        &self,
        scope: &ScopeHandle,
        key: &str,
        default: impl Into<Value>,
    ) -> Result<Value> {
        match self.executor.execute(
            &self.caller,
            Command::KvGet {
                scope: scope.clone(),
                key: key.to_string(),
                default: Some(default.into()),
            },
        )? {
            Output::Value(value) => Ok(value),
            _ => Err(Error::unexpected_output("KvGet")),
        }
    }

    /// Write a key.
    pub fn kv_set(
        &self,
        scope: &ScopeHandle,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<Arc<ChangeEvent>> {
        match self.executor.execute(
            &self.caller,
            Command::KvSet {
                scope: scope.clone(),
                key: key.to_string(),
                value: value.into(),
            },
        )? {
            Output::Event(event) => Ok(event),
            _ => Err(Error::unexpected_output("KvSet")),
        }
    }

    /// Remove a key.
    pub fn kv_delete(&self, scope: &ScopeHandle, key: &str) -> Result<Arc<ChangeEvent>> {
        match self.executor.execute(
            &self.caller,
            Command::KvDelete {
                scope: scope.clone(),
                key: key.to_string(),
            },
        )? {
            Output::Event(event) => Ok(event),
            _ => Err(Error::unexpected_output("KvDelete")),
        }
    }

    /// Whether a key holds a value.
    pub fn kv_exists(&self, scope: &ScopeHandle, key: &str) -> Result<bool> {
        match self.executor.execute(
            &self.caller,
            Command::KvExists {
                scope: scope.clone(),
                key: key.to_string(),
            },
        )? {
            Output::Bool(exists) => Ok(exists),
            _ => Err(Error::unexpected_output("KvExists")),
        }
    }

    /// Live keys under `prefix`, sorted.
    pub fn kv_list(&self, scope: &ScopeHandle, prefix: Option<&str>) -> Result<Vec<String>> {
        match self.executor.execute(
            &self.caller,
            Command::KvList {
                scope: scope.clone(),
                prefix: prefix.map(str::to_string),
            },
        )? {
            Output::Keys(keys) => Ok(keys),
            _ => Err(Error::unexpected_output("KvList")),
        }
    }

    // =========================================================================
    // History (2)
    // =========================================================================

    /// Most recent events visible to the caller, newest first.
    pub fn history(&self, filter: HistoryFilter, limit: usize) -> Result<HistoryPage> {
        match self.executor.execute(
            &self.caller,
            Command::History {
                scope: filter.scope,
                scope_kind: filter.scope_kind,
                key_pattern: filter.key_pattern,
                action: filter.action,
                since: filter.since,
                limit,
            },
        )? {
            Output::History(page) => Ok(page),
            _ => Err(Error::unexpected_output("History")),
        }
    }

    /// Most recent deletes in `scope`.
    pub fn recent_deletes(&self, scope: &ScopeHandle, limit: usize) -> Result<HistoryPage> {
        self.history(
            HistoryFilter::new()
                .scope(scope.clone())
                .action(EventAction::Delete),
            limit,
        )
    }
}
