/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # amqp-router
//!
//! `amqp-router` maintains AMQP-style sender and listener endpoints at runtime
//! and routes events between an in-process command bus and a transport
//! connection.
//!
//! Commands ("create a listener for A", "send this event to B", "delete C")
//! are pushed through a [`RouterHandle`]. A single dispatch loop owns the
//! sender and listener maps and applies commands strictly in arrival order;
//! deliveries and subscriptions run as tracked background tasks that report
//! through the result bus.
//!
//! ```
//! use amqp_router::{Command, Event, Router, RouterConfig, Status};
//! use in_memory_broker::InMemoryBroker;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let broker = Arc::new(InMemoryBroker::new());
//! let handle = Router::new("quick-start", RouterConfig::new("amqp://localhost"), broker.clone())
//!     .start();
//! let mut results = handle.subscribe();
//!
//! handle.execute(Command::create_listener("cluster/node1/ptp")).await.unwrap();
//!
//! let event = Event::new("ptp.status", "/cluster/node1");
//! broker.publish("cluster/node1/ptp", event.clone()).await.unwrap();
//!
//! let result = results.recv().await.unwrap();
//! assert_eq!(result.status, Status::Succeed);
//! assert_eq!(result.payload, Some(event));
//!
//! handle.shutdown().await.unwrap();
//! # });
//! ```
//!
//! ## Architecture map
//!
//! - `control_plane`: dispatch loop, endpoint table and endpoint negotiation.
//! - `data_plane`: event clients, send tasks, subscription tasks and the
//!   result bus.
//! - `runtime`: the tracked task scope drained on shutdown.
//!
//! ## Observability
//!
//! Logs are emitted through `tracing` with a stable `event` field whose values
//! live in [`observability::events`]. The crate never installs a subscriber.

mod command;
mod config;
mod control_plane;
mod data_plane;
mod error;
mod event;
mod event_handler;
#[doc(hidden)]
pub mod observability;
mod router;
mod runtime;
mod transport;

pub use command::{Command, CommandAck, EndpointKind, EndpointSnapshot, RouterResult, Status};
pub use config::{ConfigError, RouterConfig};
pub use error::{NegotiationStage, RouterError};
pub use event::{Event, EventError};
pub use event_handler::{handler_fn, AcceptAll, EventHandler, FnHandler};
pub use router::{Router, RouterHandle};
pub use transport::{
    Connection, DeliveryError, ReceiverLink, SenderLink, Session, TransportError,
};
