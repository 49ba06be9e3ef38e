//! Live subscription table

use crate::subscription::{Subscription, SubscriptionId};
use fabric_core::ChangeEvent;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Subscriptions that matched one event.
pub type Matches = SmallVec<[Arc<Subscription>; 4]>;

/// All subscriptions known to a dispatcher.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<FxHashMap<SubscriptionId, Arc<Subscription>>>,
}

impl SubscriptionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription.
    pub fn insert(&self, subscription: Arc<Subscription>) {
        self.subscriptions
            .write()
            .insert(subscription.id(), subscription);
    }

    /// Remove a subscription, returning it if present.
    pub fn remove(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions.write().remove(&id)
    }

    /// Look up a subscription.
    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions.read().get(&id).cloned()
    }

    /// Active subscriptions that match `event`.
    pub fn matching(&self, event: &ChangeEvent) -> Matches {
        self.subscriptions
            .read()
            .values()
            .filter(|s| s.is_active() && s.matches(event))
            .cloned()
            .collect()
    }

    /// Remove and return every subscription.
    pub fn drain(&self) -> Vec<Arc<Subscription>> {
        self.subscriptions.write().drain().map(|(_, s)| s).collect()
    }

    /// Number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.len())
            .finish()
    }
}
