//! Scope handles and partition identifiers
//!
//! A scope is a named partition of shared state. `Global` is a singleton;
//! `Session`, `Actor` and `Workflow` scopes are identified by a string id.
//! The `(kind, id)` pair is the partition key for every record, vector and
//! event in the fabric.

use crate::error::{FabricError, FabricResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Process-wide singleton scope
    Global,
    /// Conversation/session scope shared by every agent that knows its id
    Session,
    /// Per-actor scope, accessible only to that actor
    Actor,
    /// Per-workflow scope, tied to an execution known to the orchestrator
    Workflow,
}

impl ScopeKind {
    /// Wire name of the kind (`"global"`, `"session"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Session => "session",
            ScopeKind::Actor => "actor",
            ScopeKind::Workflow => "workflow",
        }
    }

    /// Whether handles of this kind carry an id.
    pub fn requires_id(&self) -> bool {
        !matches!(self, ScopeKind::Global)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeKind {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(ScopeKind::Global),
            "session" => Ok(ScopeKind::Session),
            "actor" => Ok(ScopeKind::Actor),
            "workflow" => Ok(ScopeKind::Workflow),
            other => Err(FabricError::invalid_input(format!(
                "unknown scope kind '{}'",
                other
            ))),
        }
    }
}

/// Identity of a scope: `(kind, id)`.
///
/// Construct through [`ScopeHandle::global`], [`ScopeHandle::session`],
/// [`ScopeHandle::actor`], [`ScopeHandle::workflow`], or the validating
/// [`ScopeHandle::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeHandle {
    kind: ScopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl ScopeHandle {
    /// Validate and build a handle.
    ///
    /// `Global` must not carry an id; every other kind needs a non-empty one.
    pub fn new(kind: ScopeKind, id: Option<String>) -> FabricResult<Self> {
        match (kind.requires_id(), id) {
            (false, None) => Ok(Self { kind, id: None }),
            (false, Some(_)) => Err(FabricError::invalid_input(
                "global scope does not take an id",
            )),
            (true, Some(id)) if !id.is_empty() => Ok(Self { kind, id: Some(id) }),
            (true, _) => Err(FabricError::invalid_input(format!(
                "{} scope requires a non-empty id",
                kind
            ))),
        }
    }

    /// The global singleton scope.
    pub fn global() -> Self {
        Self {
            kind: ScopeKind::Global,
            id: None,
        }
    }

    /// A session scope.
    pub fn session(id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Session,
            id: Some(id.into()),
        }
    }

    /// An actor scope.
    pub fn actor(id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Actor,
            id: Some(id.into()),
        }
    }

    /// A workflow scope.
    pub fn workflow(id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Workflow,
            id: Some(id.into()),
        }
    }

    /// Scope kind.
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Scope id (`None` for global).
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Check that a handle built through the unchecked constructors is sound.
    pub fn validate(&self) -> FabricResult<()> {
        Self::new(self.kind, self.id.clone()).map(|_| ())
    }
}

impl fmt::Display for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl FromStr for ScopeHandle {
    type Err = FabricError;

    /// Parse `"global"` or `"<kind>:<id>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((kind, id)) => ScopeHandle::new(kind.parse()?, Some(id.to_string())),
            None => ScopeHandle::new(s.parse()?, None),
        }
    }
}

/// Physical partition assigned to a scope by the registry.
///
/// Compact and `Copy`, so storage shards, lock stripes and log partitions
/// can key on it without cloning scope ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId(u32);

impl PartitionId {
    /// Wrap a raw partition number.
    pub const fn new(raw: u32) -> Self {
        PartitionId(raw)
    }

    /// Raw partition number.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}
