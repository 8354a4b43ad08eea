//! Data-plane layer.
//!
//! Owns the event clients wrapped around transport links, the short-lived
//! send tasks, the per-listener subscription tasks and the result bus they
//! report to. Nothing here mutates the endpoint maps.

pub(crate) mod event_client;
pub(crate) mod result_bus;
pub(crate) mod send_task;
pub(crate) mod subscription_task;
