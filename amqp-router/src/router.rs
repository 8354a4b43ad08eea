/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
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

use crate::command::{Command, CommandAck, EndpointSnapshot, RouterResult};
use crate::config::RouterConfig;
use crate::control_plane::dispatch_loop::{Dispatcher, RouterMessage};
use crate::data_plane::result_bus::ResultBus;
use crate::error::RouterError;
use crate::event::Event;
use crate::observability::{events, fields};
use crate::runtime::task_scope::TaskScope;
use crate::transport::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const COMPONENT: &str = "router";

/// A not yet started router bound to one transport connection.
///
/// # Examples
///
/// ```
/// use amqp_router::{Command, CommandAck, Router, RouterConfig, Status};
/// use in_memory_broker::InMemoryBroker;
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let broker = Arc::new(InMemoryBroker::new());
/// let router = Router::new("doc", RouterConfig::new("amqp://localhost:5672"), broker);
/// let handle = router.start();
/// let mut results = handle.subscribe();
///
/// let ack = handle.execute(Command::create_sender("cluster/node1/ptp")).await.unwrap();
/// assert_eq!(ack, CommandAck::Created);
///
/// // Nobody listens on the address, so the delivery is reported as failed.
/// let event = amqp_router::Event::new("ptp.status", "/node1");
/// handle.submit(Command::event("cluster/node1/ptp", event)).unwrap();
/// assert_eq!(results.recv().await.unwrap().status, Status::Failed);
///
/// handle.shutdown().await.unwrap();
/// # });
/// ```
pub struct Router {
    name: String,
    config: RouterConfig,
    connection: Arc<dyn Connection>,
}

impl Router {
    pub fn new(name: &str, config: RouterConfig, connection: Arc<dyn Connection>) -> Self {
        Self {
            name: name.to_string(),
            config,
            connection,
        }
    }

    /// Spawns the dispatch loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> RouterHandle {
        let scope = TaskScope::new();
        let results = ResultBus::new(self.config.result_queue_size);
        let shutdown = CancellationToken::new();
        let (inbox_sender, inbox) = mpsc::unbounded_channel();

        let handle = RouterHandle {
            name: Arc::from(self.name.as_str()),
            inbox: inbox_sender,
            results: results.clone(),
            shutdown: shutdown.clone(),
            scope: scope.clone(),
            ack_timeout: self.config.command_ack_timeout(),
            shutdown_timeout: self.config.shutdown_timeout(),
        };

        info!(
            event = events::ROUTER_START,
            component = COMPONENT,
            router = self.name.as_str(),
            host = self.config.host.as_str(),
            "starting router"
        );

        let span = tracing::info_span!("router", router = self.name.as_str());
        let dispatcher = Dispatcher::new(
            &self.name,
            self.config,
            self.connection,
            results,
            scope.clone(),
            shutdown,
        );
        scope.spawn(span, dispatcher.run(inbox));

        handle
    }
}

/// Cloneable embedder handle of a running router.
#[derive(Clone)]
pub struct RouterHandle {
    name: Arc<str>,
    inbox: mpsc::UnboundedSender<RouterMessage>,
    results: ResultBus,
    shutdown: CancellationToken,
    scope: TaskScope,
    ack_timeout: Duration,
    shutdown_timeout: Duration,
}

impl RouterHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the dispatch loop still accepts commands.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.inbox.is_closed()
    }

    /// Pushes a command onto the command bus without waiting for it.
    ///
    /// Failures are only logged and, where applicable, reported on the result
    /// bus.
    pub fn submit(&self, command: Command) -> Result<(), RouterError> {
        self.push(RouterMessage::Command {
            command,
            reply: None,
        })
    }

    /// Pushes a command and waits for its acknowledgement.
    ///
    /// Creation and construction failures come back as errors; the address
    /// then stays absent and resubmitting retries.
    pub async fn execute(&self, command: Command) -> Result<CommandAck, RouterError> {
        let address = command.address.clone();
        let (reply, ack) = oneshot::channel();
        self.push(RouterMessage::Command {
            command,
            reply: Some(reply),
        })?;

        match tokio::time::timeout(self.ack_timeout, ack).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RouterError::Closed),
            Err(_) => Err(RouterError::AckTimedOut { address }),
        }
    }

    /// Spawns one independently timed delivery per registered sender.
    pub fn send_to_all(&self, event: Event) -> Result<(), RouterError> {
        self.push(RouterMessage::Broadcast { event, reply: None })
    }

    /// Like [`send_to_all`][Self::send_to_all], returning how many deliveries
    /// were spawned.
    pub async fn broadcast(&self, event: Event) -> Result<usize, RouterError> {
        let (reply, ack) = oneshot::channel();
        self.push(RouterMessage::Broadcast {
            event,
            reply: Some(reply),
        })?;

        match tokio::time::timeout(self.ack_timeout, ack).await {
            Ok(Ok(CommandAck::Broadcast(fanout))) => Ok(fanout),
            Ok(Ok(_)) | Ok(Err(_)) => Err(RouterError::Closed),
            Err(_) => Err(RouterError::AckTimedOut {
                address: "*".to_string(),
            }),
        }
    }

    /// New receiver on the result bus. Only results published after this call
    /// are observed.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterResult> {
        self.results.subscribe()
    }

    /// Addresses currently held by the dispatch loop.
    pub async fn endpoints(&self) -> Result<EndpointSnapshot, RouterError> {
        let (reply, snapshot) = oneshot::channel();
        self.push(RouterMessage::Snapshot { reply })?;

        match tokio::time::timeout(self.ack_timeout, snapshot).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(_)) => Err(RouterError::Closed),
            Err(_) => Err(RouterError::AckTimedOut {
                address: "*".to_string(),
            }),
        }
    }

    /// Signals shutdown and waits until the dispatch loop and every spawned
    /// task finished. Calling it again only waits.
    pub async fn shutdown(&self) -> Result<(), RouterError> {
        info!(
            event = events::SHUTDOWN_START,
            component = COMPONENT,
            router = &*self.name,
            active_tasks = self.scope.active_tasks(),
            "shutting down router"
        );
        self.shutdown.cancel();

        if self.scope.drain(self.shutdown_timeout).await {
            info!(
                event = events::SHUTDOWN_OK,
                component = COMPONENT,
                router = &*self.name,
                "router drained"
            );
            Ok(())
        } else {
            warn!(
                event = events::SHUTDOWN_TIMED_OUT,
                component = COMPONENT,
                router = &*self.name,
                deadline_ms = fields::duration_ms(self.shutdown_timeout),
                active_tasks = self.scope.active_tasks(),
                "router did not drain before deadline"
            );
            self.scope.cancel();
            Err(RouterError::ShutdownTimedOut(self.shutdown_timeout))
        }
    }

    fn push(&self, message: RouterMessage) -> Result<(), RouterError> {
        if self.shutdown.is_cancelled() {
            return Err(RouterError::Closed);
        }
        self.inbox.send(message).map_err(|_| RouterError::Closed)
    }
}
