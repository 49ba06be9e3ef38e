//! History queries over the event log
//!
//! `get_history` answers "what changed recently" for one caller. The
//! visible set is every partition the caller may read: Global, every
//! Session, every registered Workflow, and the caller's own Actor scope
//! (privileged callers see every Actor scope too). Results are newest
//! first by log position and capped at `FabricConfig::history_cap`.
//!
//! A page never silently comes back short: `exhausted` says whether fewer
//! events existed than the limit that was applied.

use crate::database::Fabric;
use chrono::{DateTime, Utc};
use fabric_core::{ChangeEvent, EventAction, FabricResult, PartitionId, ScopeHandle, ScopeKind};
use fabric_dispatch::Pattern;
use fabric_security::{CallerContext, Operation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Narrowing applied to a history query. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryFilter {
    /// Only this scope instance
    pub scope: Option<ScopeHandle>,
    /// Only scopes of this kind
    pub scope_kind: Option<ScopeKind>,
    /// Only keys matching this wildcard pattern
    pub key_pattern: Option<String>,
    /// Only sets or only deletes
    pub action: Option<EventAction>,
    /// Only events committed at or after this time
    pub since: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    /// Match everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one scope.
    pub fn scope(mut self, scope: ScopeHandle) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Restrict to one scope kind.
    pub fn scope_kind(mut self, kind: ScopeKind) -> Self {
        self.scope_kind = Some(kind);
        self
    }

    /// Restrict to keys matching `pattern`.
    pub fn key_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.key_pattern = Some(pattern.into());
        self
    }

    /// Restrict to one action.
    pub fn action(mut self, action: EventAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Restrict to events at or after `since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// One page of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Events, newest first
    pub events: Vec<Arc<ChangeEvent>>,
    /// Limit actually applied after the server-side cap
    pub limit_applied: usize,
    /// True when no further matching events exist beyond this page
    pub exhausted: bool,
}

impl HistoryPage {
    /// Number of events in the page.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the page is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Fabric {
    /// Most recent events visible to `caller`, newest first.
    ///
    /// `limit` is capped at the configured `history_cap`; the cap that was
    /// applied is reported in the page.
    pub fn get_history(
        &self,
        caller: &CallerContext,
        filter: &HistoryFilter,
        limit: usize,
    ) -> FabricResult<HistoryPage> {
        let pattern = filter
            .key_pattern
            .as_deref()
            .map(Pattern::parse)
            .transpose()?;

        let partitions: Vec<PartitionId> = match &filter.scope {
            Some(scope) => {
                self.authorize(caller, scope, Operation::Read)?;
                self.scopes.lookup(scope)?.into_iter().collect()
            }
            None => self
                .scopes
                .partitions()
                .into_iter()
                .filter(|(_, handle)| caller.can_access(handle))
                .filter(|(_, handle)| filter.scope_kind.map_or(true, |k| handle.kind() == k))
                .map(|(id, _)| id)
                .collect(),
        };

        let limit_applied = limit.min(self.config.history_cap);
        let mut events: Vec<Arc<ChangeEvent>> = self
            .log
            .recent(&partitions, limit_applied.saturating_add(1), |event| {
                filter.scope_kind.map_or(true, |k| event.scope == k)
                    && filter.action.map_or(true, |a| event.action == a)
                    && filter.since.map_or(true, |t| event.timestamp >= t)
                    && pattern.as_ref().map_or(true, |p| p.matches(&event.key))
            })
            .into_iter()
            .map(|logged| logged.event)
            .collect();

        let exhausted = events.len() <= limit_applied;
        events.truncate(limit_applied);

        if limit > limit_applied {
            tracing::debug!(
                target: "fabric::history",
                requested = limit,
                applied = limit_applied,
                "History limit capped"
            );
        }

        Ok(HistoryPage {
            events,
            limit_applied,
            exhausted,
        })
    }

    /// Events of `scope` with sequence greater than `after_sequence`,
    /// oldest first. Lagging subscribers catch up through this.
    pub fn events_for(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        after_sequence: u64,
        limit: usize,
    ) -> FabricResult<Vec<Arc<ChangeEvent>>> {
        self.authorize(caller, scope, Operation::Read)?;
        let Some(partition) = self.scopes.lookup(scope)? else {
            return Ok(Vec::new());
        };
        Ok(self
            .log
            .events_after(partition, after_sequence, limit)
            .into_iter()
            .map(|logged| logged.event)
            .collect())
    }

    /// Highest sequence assigned in `scope` (0 when nothing was written).
    pub fn latest_sequence(&self, caller: &CallerContext, scope: &ScopeHandle) -> FabricResult<u64> {
        self.authorize(caller, scope, Operation::Read)?;
        Ok(self
            .scopes
            .lookup(scope)?
            .map(|p| self.log.latest_sequence(p))
            .unwrap_or(0))
    }
}
