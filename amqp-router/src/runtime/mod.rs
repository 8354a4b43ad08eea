//! Runtime integration layer.
//!
//! Isolates task spawning, cancellation and drain tracking so the rest of the
//! crate never calls `tokio::spawn` directly.

pub(crate) mod task_scope;
