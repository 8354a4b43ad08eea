//! Outbound notification queue shared by the dispatch loop and its tasks.

use crate::command::RouterResult;
use crate::observability::{events, fields};
use tokio::sync::broadcast;
use tracing::debug;

const COMPONENT: &str = "result_bus";

#[derive(Clone, Debug)]
pub(crate) struct ResultBus {
    sender: broadcast::Sender<RouterResult>,
}

impl ResultBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<RouterResult> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, result: RouterResult) {
        if let Err(broadcast::error::SendError(result)) = self.sender.send(result) {
            debug!(
                event = events::RESULT_DROPPED_NO_SUBSCRIBER,
                component = COMPONENT,
                address = result.address.as_str(),
                kind = result.kind.as_str(),
                status = result.status.as_str(),
                event_id = %fields::format_event_id(result.payload.as_ref()),
                event_type = %fields::format_event_type(result.payload.as_ref()),
                "no result subscriber; dropping result"
            );
        }
    }
}
