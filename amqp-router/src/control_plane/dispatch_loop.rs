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

//! Single-owner command dispatch loop.
//!
//! The [`Dispatcher`] is the only code that mutates the endpoint maps. It
//! processes router messages strictly in arrival order and hands the slow
//! work (deliveries, subscriptions) to tracked tasks.

use crate::command::{Command, CommandAck, CommandAction, EndpointKind, EndpointSnapshot};
use crate::config::RouterConfig;
use crate::control_plane::endpoint_lifecycle;
use crate::control_plane::endpoint_table::EndpointTable;
use crate::data_plane::event_client::SenderClient;
use crate::data_plane::result_bus::ResultBus;
use crate::data_plane::send_task::{SendMode, SendTask};
use crate::data_plane::subscription_task::SubscriptionTask;
use crate::error::RouterError;
use crate::event::Event;
use crate::event_handler::{AcceptAll, EventHandler};
use crate::observability::{events, fields};
use crate::runtime::task_scope::TaskScope;
use crate::transport::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "dispatch_loop";

pub(crate) type CommandReply = oneshot::Sender<Result<CommandAck, RouterError>>;

/// Messages carried by the command bus.
pub(crate) enum RouterMessage {
    Command {
        command: Command,
        reply: Option<CommandReply>,
    },
    Broadcast {
        event: Event,
        reply: Option<oneshot::Sender<CommandAck>>,
    },
    Snapshot {
        reply: oneshot::Sender<EndpointSnapshot>,
    },
}

fn send_reply<T>(reply: Option<oneshot::Sender<T>>, value: T, address: &str) {
    if let Some(reply) = reply {
        if reply.send(value).is_err() {
            debug!(
                event = events::COMMAND_ACK_DROPPED,
                component = COMPONENT,
                address,
                "submitter stopped waiting for acknowledgement"
            );
        }
    }
}

pub(crate) struct Dispatcher {
    name: String,
    config: RouterConfig,
    connection: Arc<dyn Connection>,
    table: EndpointTable,
    results: ResultBus,
    scope: TaskScope,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub(crate) fn new(
        name: &str,
        config: RouterConfig,
        connection: Arc<dyn Connection>,
        results: ResultBus,
        scope: TaskScope,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            name: name.to_string(),
            config,
            connection,
            table: EndpointTable::new(),
            results,
            scope,
            shutdown,
        }
    }

    /// Runs until shutdown fires or every handle to the command bus is gone,
    /// then releases every endpoint.
    ///
    /// Endpoint negotiation is bounded by the creation deadline and abandoned
    /// on shutdown; closes are bounded by the close deadline.
    pub(crate) async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<RouterMessage>) {
        let shutdown = self.shutdown.clone();

        info!(
            event = events::DISPATCH_LOOP_START,
            component = COMPONENT,
            router = self.name.as_str(),
            "dispatch loop started"
        );

        let reason = loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break fields::REASON_SHUTDOWN,
                message = inbox.recv() => match message {
                    Some(message) => message,
                    None => break fields::REASON_COMMAND_BUS_CLOSED,
                },
            };
            self.handle_message(message).await;
        };

        // Pending submitters observe `Closed` once their replies are dropped.
        inbox.close();
        drop(inbox);

        self.release_all().await;

        info!(
            event = events::DISPATCH_LOOP_STOP,
            component = COMPONENT,
            router = self.name.as_str(),
            reason,
            "dispatch loop stopped"
        );
    }

    async fn handle_message(&mut self, message: RouterMessage) {
        match message {
            RouterMessage::Command { command, reply } => {
                let address = command.address.clone();
                let outcome = self.handle_command(command).await;
                send_reply(reply, outcome, &address);
            }
            RouterMessage::Broadcast { event, reply } => {
                let fanout = self.send_to_all(event);
                send_reply(reply, CommandAck::Broadcast(fanout), "*");
            }
            RouterMessage::Snapshot { reply } => {
                send_reply(Some(reply), self.table.snapshot(), "*");
            }
        }
    }

    pub(crate) async fn handle_command(
        &mut self,
        command: Command,
    ) -> Result<CommandAck, RouterError> {
        debug!(
            event = events::COMMAND_RECEIVED,
            component = COMPONENT,
            address = command.address.as_str(),
            kind = command.kind.as_str(),
            status = command.status.as_str(),
            "command received"
        );

        if command.address.trim().is_empty() {
            return Err(self.invalid(&command, "address must not be empty"));
        }

        match (command.action(), command.kind) {
            (CommandAction::Create, EndpointKind::Sender) => {
                self.create_sender(&command.address).await
            }
            (CommandAction::Create, _) => {
                let handler = command
                    .on_receive
                    .unwrap_or_else(|| Arc::new(AcceptAll) as Arc<dyn EventHandler>);
                self.create_listener(&command.address, handler).await
            }
            (CommandAction::Delete, EndpointKind::Sender) => {
                Ok(self.delete_sender(&command.address).await)
            }
            (CommandAction::Delete, _) => Ok(self.delete_listener(&command.address)),
            (CommandAction::Publish, _) => match command.payload {
                Some(event) => Ok(self.publish(&command.address, event)),
                None => Err(self.invalid_event(&command.address)),
            },
            (CommandAction::Ignore, _) => {
                debug!(
                    event = events::COMMAND_IGNORED,
                    component = COMPONENT,
                    address = command.address.as_str(),
                    kind = command.kind.as_str(),
                    status = command.status.as_str(),
                    "command has no action"
                );
                Ok(CommandAck::Ignored)
            }
        }
    }

    fn invalid(&self, command: &Command, reason: &str) -> RouterError {
        warn!(
            event = events::COMMAND_INVALID,
            component = COMPONENT,
            address = command.address.as_str(),
            kind = command.kind.as_str(),
            reason,
            "rejecting invalid command"
        );
        RouterError::invalid_command(reason)
    }

    fn invalid_event(&self, address: &str) -> RouterError {
        let reason = format!("event command for {address} carries no payload");
        warn!(
            event = events::COMMAND_INVALID,
            component = COMPONENT,
            address,
            kind = EndpointKind::Event.as_str(),
            reason = reason.as_str(),
            "rejecting invalid command"
        );
        RouterError::invalid_command(reason)
    }

    async fn create_sender(&mut self, address: &str) -> Result<CommandAck, RouterError> {
        if self.table.has_sender(address) {
            debug!(
                event = events::SENDER_EXISTS,
                component = COMPONENT,
                address,
                "sender already exists"
            );
            return Ok(CommandAck::AlreadyExists);
        }

        let opened =
            endpoint_lifecycle::open_sender(&self.connection, address, &self.config, &self.shutdown)
                .await;
        match opened {
            Ok(client) => {
                self.table.insert_sender(address, Arc::new(client));
                info!(
                    event = events::SENDER_CREATE_OK,
                    component = COMPONENT,
                    address,
                    "sender created"
                );
                Ok(CommandAck::Created)
            }
            Err(err) => {
                warn!(
                    event = events::SENDER_CREATE_FAILED,
                    component = COMPONENT,
                    address,
                    err = %err,
                    "failed to create sender"
                );
                Err(err)
            }
        }
    }

    async fn create_listener(
        &mut self,
        address: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<CommandAck, RouterError> {
        if self.table.has_listener(address) {
            debug!(
                event = events::LISTENER_EXISTS,
                component = COMPONENT,
                address,
                "listener already exists"
            );
            return Ok(CommandAck::AlreadyExists);
        }

        let opened = endpoint_lifecycle::open_listener(
            &self.connection,
            address,
            &self.config,
            &self.shutdown,
        )
        .await;
        let client = match opened {
            Ok(client) => client,
            Err(err) => {
                warn!(
                    event = events::LISTENER_CREATE_FAILED,
                    component = COMPONENT,
                    address,
                    err = %err,
                    "failed to create listener"
                );
                return Err(err);
            }
        };

        // Scoped to the router lifetime, not to this command.
        let cancel = self.scope.child_token();
        self.table.insert_listener(address, cancel.clone());

        let task = SubscriptionTask::new(client, handler, cancel, self.results.clone());
        self.scope.spawn(
            tracing::info_span!("subscription", router = self.name.as_str(), address),
            async move {
                task.run().await;
            },
        );

        info!(
            event = events::LISTENER_CREATE_OK,
            component = COMPONENT,
            address,
            link_credit = self.config.link_credit,
            "listener created"
        );
        Ok(CommandAck::Created)
    }

    async fn delete_sender(&mut self, address: &str) -> CommandAck {
        match self.table.remove_sender(address) {
            Some(endpoint) => {
                endpoint.client.close().await;
                info!(
                    event = events::SENDER_DELETE_OK,
                    component = COMPONENT,
                    address,
                    "sender deleted"
                );
                CommandAck::Deleted
            }
            None => {
                debug!(
                    event = events::SENDER_NOT_FOUND,
                    component = COMPONENT,
                    address,
                    "no sender to delete"
                );
                CommandAck::NotFound
            }
        }
    }

    fn delete_listener(&mut self, address: &str) -> CommandAck {
        match self.table.remove_listener(address) {
            Some(endpoint) => {
                endpoint.cancel.cancel();
                info!(
                    event = events::LISTENER_DELETE_OK,
                    component = COMPONENT,
                    address,
                    "listener deleted"
                );
                CommandAck::Deleted
            }
            None => {
                debug!(
                    event = events::LISTENER_NOT_FOUND,
                    component = COMPONENT,
                    address,
                    "no listener to delete"
                );
                CommandAck::NotFound
            }
        }
    }

    fn publish(&self, address: &str, event: Event) -> CommandAck {
        let Some(client) = self.table.sender(address) else {
            debug!(
                event = events::SEND_DROPPED_NO_SENDER,
                component = COMPONENT,
                address,
                event_id = event.id.as_str(),
                "no sender for address; dropping event"
            );
            return CommandAck::NoSender;
        };

        debug!(
            event = events::SEND_DISPATCHED,
            component = COMPONENT,
            address,
            event_id = event.id.as_str(),
            deadline_ms = self.config.send_timeout_ms,
            "dispatching event"
        );
        self.spawn_send(client, event, self.config.send_timeout(), SendMode::Targeted);
        CommandAck::Dispatched
    }

    fn send_to_all(&self, event: Event) -> usize {
        let clients = self.table.senders();
        let fanout = clients.len();

        debug!(
            event = events::BROADCAST_DISPATCHED,
            component = COMPONENT,
            event_id = event.id.as_str(),
            fanout,
            deadline_ms = self.config.broadcast_timeout_ms,
            "broadcasting event"
        );
        for client in clients {
            self.spawn_send(
                client,
                event.clone(),
                self.config.broadcast_timeout(),
                SendMode::Broadcast,
            );
        }
        fanout
    }

    fn spawn_send(
        &self,
        client: Arc<SenderClient>,
        event: Event,
        deadline: Duration,
        mode: SendMode,
    ) {
        let span = tracing::debug_span!(
            "send",
            router = self.name.as_str(),
            address = client.address(),
            event_id = event.id.as_str()
        );
        let task = SendTask::new(client, event, deadline, mode, self.results.clone());
        self.scope.spawn(span, async move {
            task.run().await;
        });
    }

    /// Closes every sender, cancels every listener and clears both maps.
    async fn release_all(&mut self) {
        let (senders, listeners) = self.table.drain();

        for endpoint in &listeners {
            endpoint.cancel.cancel();
        }
        for endpoint in senders {
            endpoint.client.close().await;
        }
        self.scope.cancel();

        debug!(
            event = events::ENDPOINTS_RELEASED,
            component = COMPONENT,
            router = self.name.as_str(),
            listeners = listeners.len(),
            "endpoints released"
        );
    }
}
