//! Subscription identity, binding and lifecycle

use crate::handler::EventHandler;
use crate::pattern::Pattern;
use fabric_core::{ChangeEvent, FabricError, FabricResult, ScopeHandle};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Unique subscription identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Which events a subscription may see beyond its key patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Every scope
    AgentWide,
    /// Only events whose scope kind and id equal this handle
    ScopeInstance(ScopeHandle),
}

impl Binding {
    /// Whether the binding lets `event` through.
    pub fn admits(&self, event: &ChangeEvent) -> bool {
        match self {
            Binding::AgentWide => true,
            Binding::ScopeInstance(scope) => event.is_in_scope(scope),
        }
    }
}

/// Lifecycle: `Registered -> Active -> Unregistered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubscriptionState {
    /// Created, not yet receiving events
    Registered = 0,
    /// Receiving events
    Active = 1,
    /// Permanently stopped
    Unregistered = 2,
}

impl SubscriptionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SubscriptionState::Registered,
            1 => SubscriptionState::Active,
            _ => SubscriptionState::Unregistered,
        }
    }
}

/// A registered interest in key patterns.
pub struct Subscription {
    id: SubscriptionId,
    patterns: Vec<Pattern>,
    binding: Binding,
    handler: Arc<dyn EventHandler>,
    state: AtomicU8,
}

impl Subscription {
    /// Create a subscription in the `Registered` state.
    pub fn new(
        patterns: Vec<Pattern>,
        binding: Binding,
        handler: Arc<dyn EventHandler>,
    ) -> FabricResult<Self> {
        if patterns.is_empty() {
            return Err(FabricError::pattern_syntax(
                "",
                "a subscription needs at least one pattern",
            ));
        }
        if let Binding::ScopeInstance(scope) = &binding {
            scope.validate()?;
        }

        Ok(Self {
            id: SubscriptionId::new(),
            patterns,
            binding,
            handler,
            state: AtomicU8::new(SubscriptionState::Registered as u8),
        })
    }

    /// Subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Key patterns.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Scope binding.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub(crate) fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }

    /// Whether `event` should be delivered here.
    ///
    /// Several matching patterns still mean one delivery.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.binding.admits(event) && self.patterns.iter().any(|p| p.matches(&event.key))
    }

    /// Current state.
    pub fn state(&self) -> SubscriptionState {
        SubscriptionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True while receiving events.
    pub fn is_active(&self) -> bool {
        self.state() == SubscriptionState::Active
    }

    /// `Registered -> Active`. False if the subscription was not `Registered`.
    pub fn activate(&self) -> bool {
        self.state
            .compare_exchange(
                SubscriptionState::Registered as u8,
                SubscriptionState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `Unregistered`. False if it already was.
    pub fn deactivate(&self) -> bool {
        self.state
            .swap(SubscriptionState::Unregistered as u8, Ordering::AcqRel)
            != SubscriptionState::Unregistered as u8
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("patterns", &self.patterns)
            .field("binding", &self.binding)
            .field("state", &self.state())
            .finish()
    }
}
