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

//! Command bus and result bus message shapes.

use crate::event::Event;
use crate::event_handler::EventHandler;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointKind {
    Listener,
    Sender,
    Event,
    Status,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Listener => "listener",
            EndpointKind::Sender => "sender",
            EndpointKind::Event => "event",
            EndpointKind::Status => "status",
        }
    }
}

impl Display for EndpointKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    New,
    Delete,
    Succeed,
    Failed,
    /// The subscriber returned a negative acknowledgement.
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::Delete => "delete",
            Status::Succeed => "succeed",
            Status::Failed => "failed",
            Status::Rejected => "rejected",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the dispatch loop does with a [`Command`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CommandAction {
    Create,
    Delete,
    Publish,
    Ignore,
}

/// One message on the command bus.
///
/// ```
/// use amqp_router::{Command, EndpointKind, Event, Status};
///
/// let create = Command::create_sender("cluster/node1/ptp");
/// assert_eq!(create.kind, EndpointKind::Sender);
/// assert_eq!(create.status, Status::New);
///
/// let publish = Command::event("cluster/node1/ptp", Event::new("ptp.status", "/node1"));
/// assert!(publish.payload.is_some());
/// ```
#[derive(Clone)]
pub struct Command {
    pub address: String,
    pub kind: EndpointKind,
    pub status: Status,
    pub payload: Option<Event>,
    pub on_receive: Option<Arc<dyn EventHandler>>,
}

impl Command {
    pub fn new(address: &str, kind: EndpointKind, status: Status) -> Self {
        Self {
            address: address.to_string(),
            kind,
            status,
            payload: None,
            on_receive: None,
        }
    }

    pub fn create_listener(address: &str) -> Self {
        Self::new(address, EndpointKind::Listener, Status::New)
    }

    /// Creates a listener whose received events are passed to `handler`.
    pub fn create_listener_with(address: &str, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            on_receive: Some(handler),
            ..Self::create_listener(address)
        }
    }

    pub fn delete_listener(address: &str) -> Self {
        Self::new(address, EndpointKind::Listener, Status::Delete)
    }

    pub fn create_sender(address: &str) -> Self {
        Self::new(address, EndpointKind::Sender, Status::New)
    }

    pub fn delete_sender(address: &str) -> Self {
        Self::new(address, EndpointKind::Sender, Status::Delete)
    }

    pub fn event(address: &str, event: Event) -> Self {
        Self {
            payload: Some(event),
            ..Self::new(address, EndpointKind::Event, Status::New)
        }
    }

    pub fn status(address: &str, status: Status) -> Self {
        Self::new(address, EndpointKind::Status, status)
    }

    pub(crate) fn action(&self) -> CommandAction {
        match (self.kind, self.status) {
            (EndpointKind::Listener | EndpointKind::Sender, Status::Delete) => {
                CommandAction::Delete
            }
            (EndpointKind::Listener | EndpointKind::Sender, _) => CommandAction::Create,
            (EndpointKind::Event, Status::New) => CommandAction::Publish,
            (EndpointKind::Event, _) | (EndpointKind::Status, _) => CommandAction::Ignore,
        }
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("address", &self.address)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("payload", &self.payload.as_ref().map(|event| &event.id))
            .field("on_receive", &self.on_receive.is_some())
            .finish()
    }
}

/// One message on the result bus.
#[derive(Clone, Debug, PartialEq)]
pub struct RouterResult {
    pub address: String,
    pub kind: EndpointKind,
    pub status: Status,
    pub payload: Option<Event>,
}

impl RouterResult {
    pub(crate) fn event(address: &str, status: Status, payload: Event) -> Self {
        Self {
            address: address.to_string(),
            kind: EndpointKind::Event,
            status,
            payload: Some(payload),
        }
    }

    pub(crate) fn listener_failed(address: &str) -> Self {
        Self {
            address: address.to_string(),
            kind: EndpointKind::Listener,
            status: Status::Failed,
            payload: None,
        }
    }
}

/// Per-command acknowledgement returned by
/// [`RouterHandle::execute`][crate::RouterHandle::execute].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandAck {
    Created,
    AlreadyExists,
    Deleted,
    NotFound,
    /// A send task was spawned for the event.
    Dispatched,
    /// No sender exists for the address; the event was dropped.
    NoSender,
    Ignored,
    /// Number of send tasks spawned for a broadcast.
    Broadcast(usize),
}

/// Addresses currently held by the router.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EndpointSnapshot {
    pub senders: Vec<String>,
    pub listeners: Vec<String>,
}

impl EndpointSnapshot {
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty() && self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, CommandAction, EndpointKind, Status};
    use crate::event::Event;
    use crate::event_handler::AcceptAll;
    use std::sync::Arc;

    #[test]
    fn endpoint_commands_default_to_create() {
        assert_eq!(
            Command::create_listener("a").action(),
            CommandAction::Create
        );
        assert_eq!(Command::create_sender("a").action(), CommandAction::Create);
        assert_eq!(
            Command::new("a", EndpointKind::Sender, Status::Succeed).action(),
            CommandAction::Create
        );
    }

    #[test]
    fn delete_flag_selects_delete() {
        assert_eq!(
            Command::delete_listener("a").action(),
            CommandAction::Delete
        );
        assert_eq!(Command::delete_sender("a").action(), CommandAction::Delete);
    }

    #[test]
    fn only_new_events_are_published() {
        let publish = Command::event("a", Event::new("t", "s"));
        assert_eq!(publish.action(), CommandAction::Publish);

        let mut stale = publish.clone();
        stale.status = Status::Failed;
        assert_eq!(stale.action(), CommandAction::Ignore);
    }

    #[test]
    fn status_commands_are_ignored() {
        assert_eq!(
            Command::status("a", Status::New).action(),
            CommandAction::Ignore
        );
        assert_eq!(
            Command::status("a", Status::Delete).action(),
            CommandAction::Ignore
        );
    }

    #[test]
    fn listener_with_handler_keeps_handler() {
        let command = Command::create_listener_with("a", Arc::new(AcceptAll));

        assert!(command.on_receive.is_some());
        assert_eq!(command.kind, EndpointKind::Listener);
        assert!(format!("{command:?}").contains("on_receive: true"));
    }

    #[test]
    fn kinds_and_statuses_serialize_in_upper_case() {
        assert_eq!(
            serde_json::to_string(&EndpointKind::Listener).unwrap(),
            "\"LISTENER\""
        );
        assert_eq!(
            serde_json::to_string(&Status::Rejected).unwrap(),
            "\"REJECTED\""
        );
    }
}
