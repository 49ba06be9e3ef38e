//! Change-event subscriptions for the memory fabric
//!
//! - `pattern`: dotted key patterns with `*` segment wildcards
//! - `subscription`: ids, scope bindings, lifecycle state
//! - `handler`: the async `EventHandler` trait
//! - `registry`: live subscription table
//! - `dispatcher`: lane-based asynchronous delivery

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod handler;
pub mod pattern;
pub mod registry;
pub mod subscription;

pub use dispatcher::{
    DispatchHandlerError, DispatchStats, Dispatcher, DispatcherConfig, SubscriptionGuard,
    DEFAULT_HANDLER_TIMEOUT, DEFAULT_LANE_CAPACITY,
};
pub use handler::{handler_fn, EventHandler, FnHandler};
pub use pattern::{Pattern, Segment};
pub use registry::SubscriptionRegistry;
pub use subscription::{Binding, Subscription, SubscriptionId, SubscriptionState};
