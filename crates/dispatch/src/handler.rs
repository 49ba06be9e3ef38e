//! Subscriber callbacks

use async_trait::async_trait;
use fabric_core::ChangeEvent;
use std::future::Future;
use std::sync::Arc;

/// Receives change events for a subscription.
///
/// Errors and panics are contained by the dispatcher: they are logged and
/// counted, and never reach the writer or other subscriptions.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handle one event.
    async fn handle(&self, event: Arc<ChangeEvent>) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into an [`EventHandler`].
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<ChangeEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: Arc<ChangeEvent>) -> anyhow::Result<()> {
        (self.f)(event).await
    }
}

/// Wrap an async closure as a handler.
///
/// ```ignore
/// let handler = handler_fn(|event| async move {
///     println!("{} -> {:?}", event.key, event.data);
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Arc<ChangeEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnHandler { f }
}
