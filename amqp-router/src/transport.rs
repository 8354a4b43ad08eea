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

//! Transport collaborator traits.
//!
//! The router never speaks the wire protocol itself. An embedder supplies an
//! established [`Connection`] and the router opens one [`Session`] per endpoint,
//! attaching a single sender or receiver link on it.

use crate::event::Event;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Session, link and connection level failures reported by a transport.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    #[error("session negotiation failed: {0}")]
    Session(String),
    #[error("link negotiation failed: {0}")]
    Link(String),
    #[error("link detached by peer: {0}")]
    Detached(String),
    #[error("link closed")]
    Closed,
    #[error("transport did not answer within {0:?}")]
    TimedOut(Duration),
}

/// Delivery outcome for a single outbound event.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DeliveryError {
    /// No active subscriber was reachable for the address.
    #[error("event undelivered: {0}")]
    Undelivered(String),
    /// A subscriber explicitly declined the event.
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// An established transport connection able to open sessions.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn Session>, TransportError>;
}

/// A session on a [`Connection`] able to attach links.
#[async_trait]
pub trait Session: Send + Sync {
    async fn open_sender(&self, address: &str) -> Result<Box<dyn SenderLink>, TransportError>;

    /// Attaches a receiver link granting `link_credit` outstanding deliveries.
    async fn open_receiver(
        &self,
        address: &str,
        link_credit: u32,
    ) -> Result<Box<dyn ReceiverLink>, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait SenderLink: Send + Sync {
    /// Whether the peer still holds the link attached.
    fn is_attached(&self) -> bool;

    /// Sends one event and waits for its disposition.
    async fn send(&self, event: &Event) -> Result<(), DeliveryError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait ReceiverLink: Send {
    fn is_attached(&self) -> bool;

    /// Waits for the next delivery.
    ///
    /// Implementations must be cancel safe: dropping the returned future must
    /// not lose a delivery.
    async fn receive(&mut self) -> Result<Event, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}
