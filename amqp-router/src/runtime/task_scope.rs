//! Tracked task scope bound to the router lifetime.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Owns the router lifetime token and the counted barrier every spawned task
/// is registered with.
#[derive(Clone, Debug)]
pub(crate) struct TaskScope {
    lifetime: CancellationToken,
    tracker: TaskTracker,
}

impl TaskScope {
    pub(crate) fn new() -> Self {
        Self {
            lifetime: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Token cancelled with the scope but independently cancellable.
    pub(crate) fn child_token(&self) -> CancellationToken {
        self.lifetime.child_token()
    }

    pub(crate) fn spawn<F>(&self, span: tracing::Span, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task.instrument(span));
    }

    pub(crate) fn cancel(&self) {
        self.lifetime.cancel();
    }

    pub(crate) fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Stops accepting the scope as open and waits until every tracked task
    /// finished. Returns `false` when `limit` elapsed first.
    pub(crate) async fn drain(&self, limit: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(limit, self.tracker.wait())
            .await
            .is_ok()
    }
}
