//! Receive-side capability injected into listeners.

use crate::event::Event;
use async_trait::async_trait;

/// Consumes one received event and reports whether it was handled.
///
/// The outcome classifies the result emitted for the event: `Ok` becomes
/// [`Status::Succeed`][crate::Status::Succeed], `Err` becomes
/// [`Status::Failed`][crate::Status::Failed].
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_receive(&self, event: &Event) -> anyhow::Result<()>;
}

/// Default handler, forwards every event as succeeded.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

#[async_trait]
impl EventHandler for AcceptAll {
    async fn on_receive(&self, _event: &Event) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    async fn on_receive(&self, event: &Event) -> anyhow::Result<()> {
        (self.f)(event)
    }
}

/// Wraps a synchronous closure as an [`EventHandler`].
///
/// ```
/// use amqp_router::{handler_fn, Command};
/// use std::sync::Arc;
///
/// let handler = handler_fn(|event| {
///     anyhow::ensure!(event.has_data(), "event {} carries no data", event.id);
///     Ok(())
/// });
/// let command = Command::create_listener_with("cluster/node1/status", Arc::new(handler));
/// assert!(command.on_receive.is_some());
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    FnHandler { f }
}

#[cfg(test)]
mod tests {
    use super::{handler_fn, AcceptAll, EventHandler};
    use crate::event::Event;

    #[tokio::test]
    async fn accept_all_never_fails() {
        assert!(AcceptAll
            .on_receive(&Event::new("t", "s"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn handler_fn_propagates_errors() {
        let handler = handler_fn(|event| {
            if event.event_type == "bad" {
                anyhow::bail!("bad event");
            }
            Ok(())
        });

        assert!(handler.on_receive(&Event::new("good", "s")).await.is_ok());
        assert!(handler.on_receive(&Event::new("bad", "s")).await.is_err());
    }
}
