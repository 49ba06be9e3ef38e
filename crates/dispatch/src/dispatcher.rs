//! Asynchronous event dispatcher
//!
//! Writers call [`Dispatcher::publish`] after an event is logged. Matching
//! subscriptions are resolved synchronously and one delivery per match is
//! pushed onto a lane; the call never waits on handlers.
//!
//! # Design
//!
//! - A lane is a bounded FIFO drained by a single Tokio task, so
//!   deliveries on a lane run one at a time, in push order.
//! - The lane is picked by hashing `(subscription, partition, key)`:
//!   every event for one key reaches one subscription through the same
//!   lane, hence in sequence order as long as the writer publishes while
//!   still holding its key lock.
//! - A full lane drops its oldest delivery.
//! - Handlers run in their own task; a panic surfaces as a `JoinError`
//!   and is counted like an error.
//! - Liveness is decided once, at publish. A delivery already queued runs
//!   even when its subscription is removed before the lane reaches it;
//!   only later events stop.
//! - A handler running past `handler_timeout` is aborted and counted as a
//!   failure, so one stuck subscriber cannot hold its lane forever. The
//!   runtime must have its time driver enabled when a timeout is set.

use crate::handler::EventHandler;
use crate::pattern::Pattern;
use crate::registry::SubscriptionRegistry;
use crate::subscription::{Binding, Subscription, SubscriptionId};
use fabric_core::{ChangeEvent, FabricError, FabricResult, PartitionId};
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Default capacity of one lane.
pub const DEFAULT_LANE_CAPACITY: usize = 1024;

/// Default limit on a single handler invocation.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// A handler failure, logged at the dispatch boundary.
#[derive(Debug, Error)]
pub enum DispatchHandlerError {
    /// Handler returned an error
    #[error("handler for {subscription} failed on '{key}': {message}")]
    Failed {
        /// Subscription whose handler failed
        subscription: SubscriptionId,
        /// Key of the event being delivered
        key: String,
        /// Error chain rendered by the handler
        message: String,
    },
    /// Handler panicked
    #[error("handler for {subscription} panicked on '{key}': {message}")]
    Panicked {
        /// Subscription whose handler panicked
        subscription: SubscriptionId,
        /// Key of the event being delivered
        key: String,
        /// Panic description
        message: String,
    },
    /// Handler ran past the delivery timeout and was aborted
    #[error("handler for {subscription} timed out on '{key}' after {after:?}")]
    TimedOut {
        /// Subscription whose handler hung
        subscription: SubscriptionId,
        /// Key of the event being delivered
        key: String,
        /// Timeout that expired
        after: Duration,
    },
}

/// Lane layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Number of lanes (minimum 1)
    pub lanes: usize,
    /// Pending deliveries per lane before the oldest is dropped (minimum 1)
    pub lane_capacity: usize,
    /// Longest a single handler invocation may run; `None` waits forever
    pub handler_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            lanes: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            lane_capacity: DEFAULT_LANE_CAPACITY,
            handler_timeout: Some(DEFAULT_HANDLER_TIMEOUT),
        }
    }
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Deliveries queued
    pub enqueued: u64,
    /// Handler invocations that succeeded
    pub delivered: u64,
    /// Handler invocations that errored, panicked or timed out
    pub failed: u64,
    /// Handler invocations aborted by the timeout (included in `failed`)
    pub timed_out: u64,
    /// Deliveries evicted from a full lane
    pub dropped: u64,
    /// Deliveries queued or running right now
    pub pending: u64,
}

struct Delivery {
    subscription: Arc<Subscription>,
    event: Arc<ChangeEvent>,
}

struct Lane {
    queue: Mutex<VecDeque<Delivery>>,
    notify: Notify,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    dropped: AtomicU64,
    pending: AtomicU64,
}

struct Shared {
    lanes: Vec<Lane>,
    capacity: usize,
    handler_timeout: Option<Duration>,
    counters: Counters,
    closed: AtomicBool,
    idle: Notify,
}

impl Shared {
    fn finish_one(&self) {
        if self.counters.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn deliver(&self, delivery: Delivery) {
        let Delivery {
            subscription,
            event,
        } = delivery;

        let handler = Arc::clone(subscription.handler());
        let handler_event = Arc::clone(&event);
        let mut task = tokio::spawn(async move { handler.handle(handler_event).await });

        let outcome = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                    self.report(
                        &event,
                        DispatchHandlerError::TimedOut {
                            subscription: subscription.id(),
                            key: event.key.clone(),
                            after: limit,
                        },
                    );
                    return;
                }
            },
            None => task.await,
        };

        let failure = match outcome {
            Ok(Ok(())) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Ok(Err(e)) => DispatchHandlerError::Failed {
                subscription: subscription.id(),
                key: event.key.clone(),
                message: format!("{:#}", e),
            },
            Err(join) => DispatchHandlerError::Panicked {
                subscription: subscription.id(),
                key: event.key.clone(),
                message: join.to_string(),
            },
        };
        self.report(&event, failure);
    }

    fn report(&self, event: &ChangeEvent, failure: DispatchHandlerError) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        let subscription = match &failure {
            DispatchHandlerError::Failed { subscription, .. }
            | DispatchHandlerError::Panicked { subscription, .. }
            | DispatchHandlerError::TimedOut { subscription, .. } => *subscription,
        };
        tracing::warn!(
            target: "fabric::dispatch",
            subscription = %subscription,
            scope = %event.scope,
            sequence = event.sequence,
            error = %failure,
            "Subscription handler failed"
        );
    }
}

async fn run_lane(shared: Arc<Shared>, index: usize) {
    loop {
        let next = shared.lanes[index].queue.lock().pop_front();
        match next {
            Some(delivery) => {
                shared.deliver(delivery).await;
                shared.finish_one();
            }
            None if shared.closed.load(Ordering::Acquire) => break,
            None => shared.lanes[index].notify.notified().await,
        }
    }
    tracing::trace!(target: "fabric::dispatch", lane = index, "Lane stopped");
}

enum DispatchRuntime {
    Borrowed(Handle),
    Owned(Option<Runtime>),
}

impl DispatchRuntime {
    fn acquire(lanes: usize) -> FabricResult<Self> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(DispatchRuntime::Borrowed(handle));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(lanes.clamp(1, 4))
            .thread_name("fabric-dispatch")
            .enable_all()
            .build()
            .map_err(|e| FabricError::internal(format!("failed to start dispatch runtime: {}", e)))?;
        Ok(DispatchRuntime::Owned(Some(runtime)))
    }

    fn spawn<F>(&self, future: F) -> Option<JoinHandle<()>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        match self {
            DispatchRuntime::Borrowed(handle) => Some(handle.spawn(future)),
            DispatchRuntime::Owned(Some(runtime)) => Some(runtime.spawn(future)),
            DispatchRuntime::Owned(None) => None,
        }
    }
}

impl Drop for DispatchRuntime {
    fn drop(&mut self) {
        if let DispatchRuntime::Owned(runtime) = self {
            if let Some(runtime) = runtime.take() {
                runtime.shutdown_background();
            }
        }
    }
}

/// Routes change events to subscription handlers.
pub struct Dispatcher {
    shared: Arc<Shared>,
    registry: Arc<SubscriptionRegistry>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    runtime: DispatchRuntime,
}

impl Dispatcher {
    /// Start a dispatcher with `config.lanes` lane tasks.
    ///
    /// Runs on the current Tokio runtime when called inside one, otherwise
    /// on an owned runtime named `fabric-dispatch`.
    pub fn new(config: DispatcherConfig) -> FabricResult<Self> {
        let lane_count = config.lanes.max(1);
        let shared = Arc::new(Shared {
            lanes: (0..lane_count)
                .map(|_| Lane {
                    queue: Mutex::new(VecDeque::new()),
                    notify: Notify::new(),
                })
                .collect(),
            capacity: config.lane_capacity.max(1),
            handler_timeout: config.handler_timeout,
            counters: Counters::default(),
            closed: AtomicBool::new(false),
            idle: Notify::new(),
        });

        let runtime = DispatchRuntime::acquire(lane_count)?;
        let workers = (0..lane_count)
            .filter_map(|index| runtime.spawn(run_lane(Arc::clone(&shared), index)))
            .collect();

        tracing::debug!(
            target: "fabric::dispatch",
            lanes = lane_count,
            capacity = shared.capacity,
            owned_runtime = matches!(runtime, DispatchRuntime::Owned(_)),
            "Dispatcher started"
        );

        Ok(Self {
            shared,
            registry: Arc::new(SubscriptionRegistry::new()),
            workers: Mutex::new(workers),
            runtime,
        })
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a handler for any of `patterns`.
    pub fn subscribe<I, S>(
        &self,
        patterns: I,
        binding: Binding,
        handler: impl EventHandler,
    ) -> FabricResult<SubscriptionId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.subscribe_arc(patterns, binding, Arc::new(handler))
    }

    /// Register a shared handler for any of `patterns`.
    pub fn subscribe_arc<I, S>(
        &self,
        patterns: I,
        binding: Binding,
        handler: Arc<dyn EventHandler>,
    ) -> FabricResult<SubscriptionId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.is_closed() {
            return Err(FabricError::internal("dispatcher is shut down"));
        }

        let patterns = patterns
            .into_iter()
            .map(|p| Pattern::parse(p.as_ref()))
            .collect::<FabricResult<Vec<_>>>()?;
        let subscription = Arc::new(Subscription::new(patterns, binding, handler)?);
        let id = subscription.id();

        self.registry.insert(Arc::clone(&subscription));
        subscription.activate();

        tracing::debug!(
            target: "fabric::dispatch",
            subscription = %id,
            patterns = ?subscription.patterns().iter().map(Pattern::as_str).collect::<Vec<_>>(),
            "Subscription active"
        );
        Ok(id)
    }

    /// Like [`subscribe`](Self::subscribe), unregistering when the guard drops.
    pub fn subscribe_guarded<I, S>(
        &self,
        patterns: I,
        binding: Binding,
        handler: impl EventHandler,
    ) -> FabricResult<SubscriptionGuard>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id = self.subscribe(patterns, binding, handler)?;
        Ok(SubscriptionGuard {
            id,
            registry: Arc::clone(&self.registry),
            armed: true,
        })
    }

    /// Stop deliveries of events published from now on. Deliveries already
    /// queued for `id` still run.
    ///
    /// Returns whether the subscription was live.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        unregister(&self.registry, id)
    }

    /// Number of registered subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Look up a subscription.
    pub fn subscription(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.registry.get(id)
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    /// Queue `event` for every matching subscription. Never blocks on handlers.
    ///
    /// Returns the number of deliveries queued.
    pub fn publish(&self, partition: PartitionId, event: &Arc<ChangeEvent>) -> usize {
        if self.is_closed() {
            return 0;
        }

        let matches = self.registry.matching(event);
        for subscription in &matches {
            let lane = self.lane_for(subscription.id(), partition, &event.key);
            self.enqueue(
                lane,
                Delivery {
                    subscription: Arc::clone(subscription),
                    event: Arc::clone(event),
                },
            );
        }
        matches.len()
    }

    fn lane_for(&self, id: SubscriptionId, partition: PartitionId, key: &str) -> usize {
        let mut hasher = FxHasher::default();
        id.hash(&mut hasher);
        partition.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shared.lanes.len()
    }

    fn enqueue(&self, index: usize, delivery: Delivery) {
        let lane = &self.shared.lanes[index];
        let evicted = {
            let mut queue = lane.queue.lock();
            let evicted = if queue.len() >= self.shared.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(delivery);
            // pending is a net count, so only grow it when nothing was evicted
            if evicted.is_none() {
                self.shared.counters.pending.fetch_add(1, Ordering::AcqRel);
            }
            evicted
        };
        self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);

        if let Some(old) = evicted {
            self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                target: "fabric::dispatch",
                lane = index,
                subscription = %old.subscription.id(),
                key = %old.event.key,
                sequence = old.event.sequence,
                "Dispatch lane full; dropped oldest delivery"
            );
        }
        lane.notify.notify_one();
    }

    // ========================================================================
    // Observation and shutdown
    // ========================================================================

    /// Snapshot of the delivery counters.
    pub fn stats(&self) -> DispatchStats {
        let c = &self.shared.counters;
        DispatchStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            pending: c.pending.load(Ordering::Acquire),
        }
    }

    /// Whether deliveries run on a runtime owned by this dispatcher.
    pub fn owns_runtime(&self) -> bool {
        matches!(self.runtime, DispatchRuntime::Owned(_))
    }

    /// Number of lanes.
    pub fn lane_count(&self) -> usize {
        self.shared.lanes.len()
    }

    /// Wait until no delivery is queued or running.
    pub async fn quiesce(&self) {
        loop {
            let idle = self.shared.idle.notified();
            if self.shared.counters.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Blocking variant of [`quiesce`](Self::quiesce) for callers outside
    /// an async context. Returns false on timeout.
    pub fn quiesce_blocking(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.shared.counters.pending.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Stop accepting events. Queued deliveries still drain.
    pub fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            for lane in &self.shared.lanes {
                lane.notify.notify_one();
            }
        }
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Close, drain queued deliveries, then unregister everything.
    pub async fn shutdown(&self) {
        self.close();
        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!(target: "fabric::dispatch", error = %e, "Lane task ended abnormally");
            }
        }
        for subscription in self.registry.drain() {
            subscription.deactivate();
        }
        tracing::debug!(target: "fabric::dispatch", stats = ?self.stats(), "Dispatcher shut down");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
        for subscription in self.registry.drain() {
            subscription.deactivate();
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("lanes", &self.lane_count())
            .field("subscriptions", &self.subscription_count())
            .field("stats", &self.stats())
            .finish()
    }
}

fn unregister(registry: &SubscriptionRegistry, id: SubscriptionId) -> bool {
    match registry.remove(id) {
        Some(subscription) => {
            let was_live = subscription.deactivate();
            tracing::debug!(target: "fabric::dispatch", subscription = %id, "Subscription removed");
            was_live
        }
        None => false,
    }
}

/// Subscription that unregisters itself when dropped.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard {
    id: SubscriptionId,
    registry: Arc<SubscriptionRegistry>,
    armed: bool,
}

impl SubscriptionGuard {
    /// Id of the guarded subscription.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unregister now. Returns whether the subscription was live.
    pub fn unsubscribe(mut self) -> bool {
        self.armed = false;
        unregister(&self.registry, self.id)
    }

    /// Keep the subscription alive past the guard.
    pub fn detach(mut self) -> SubscriptionId {
        self.armed = false;
        self.id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if self.armed {
            unregister(&self.registry, self.id);
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .field("armed", &self.armed)
            .finish()
    }
}
