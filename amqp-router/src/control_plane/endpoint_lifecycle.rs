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

//! Session and link negotiation for new endpoints.
//!
//! Every step runs against the endpoint's creation deadline and gives up as
//! soon as the router shuts down.

use crate::command::EndpointKind;
use crate::config::RouterConfig;
use crate::data_plane::event_client::{close_within, ReceiverClient, SenderClient};
use crate::error::{NegotiationStage, RouterError};
use crate::observability::events;
use crate::transport::{Connection, Session, TransportError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const COMPONENT: &str = "endpoint_lifecycle";

enum StepError {
    Transport(TransportError),
    Shutdown,
}

impl StepError {
    fn into_router_error(
        self,
        address: &str,
        kind: EndpointKind,
        stage: NegotiationStage,
    ) -> RouterError {
        match self {
            StepError::Transport(source) => RouterError::EndpointCreation {
                address: address.to_string(),
                kind,
                stage,
                source,
            },
            StepError::Shutdown => RouterError::Closed,
        }
    }
}

/// Deadline and cancellation shared by the steps of one negotiation.
struct Negotiation<'a> {
    deadline: Instant,
    budget: Duration,
    close_timeout: Duration,
    shutdown: &'a CancellationToken,
}

impl<'a> Negotiation<'a> {
    fn new(config: &RouterConfig, shutdown: &'a CancellationToken) -> Self {
        let budget = config.create_timeout();
        Self {
            deadline: Instant::now() + budget,
            budget,
            close_timeout: config.close_timeout(),
            shutdown,
        }
    }

    async fn step<T>(
        &self,
        step: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, StepError> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(StepError::Shutdown),
            outcome = tokio::time::timeout_at(self.deadline, step) => match outcome {
                Ok(result) => result.map_err(StepError::Transport),
                Err(_) => Err(StepError::Transport(TransportError::TimedOut(self.budget))),
            },
        }
    }

    async fn release_session(&self, address: &str, kind: EndpointKind, session: Box<dyn Session>) {
        if let Err(err) = close_within(self.close_timeout, session.close()).await {
            warn!(
                event = events::SESSION_CLOSE_FAILED,
                component = COMPONENT,
                address,
                kind = kind.as_str(),
                err = %err,
                "unable to close session after link negotiation failed"
            );
        }
    }
}

/// Opens a dedicated session and sender link for `address`.
///
/// Nothing stays open on failure. Returns [`RouterError::Closed`] when
/// `shutdown` fires first.
pub(crate) async fn open_sender(
    connection: &Arc<dyn Connection>,
    address: &str,
    config: &RouterConfig,
    shutdown: &CancellationToken,
) -> Result<SenderClient, RouterError> {
    let kind = EndpointKind::Sender;
    let negotiation = Negotiation::new(config, shutdown);

    let session = negotiation
        .step(connection.open_session())
        .await
        .map_err(|err| err.into_router_error(address, kind, NegotiationStage::Session))?;

    let attached = negotiation.step(session.open_sender(address)).await;
    let link = match attached {
        Ok(link) => link,
        Err(err) => {
            negotiation.release_session(address, kind, session).await;
            return Err(err.into_router_error(address, kind, NegotiationStage::Link));
        }
    };

    SenderClient::bind(address, session, link, negotiation.close_timeout).await
}

/// Opens a dedicated session and receiver link granting the configured
/// link credit.
pub(crate) async fn open_listener(
    connection: &Arc<dyn Connection>,
    address: &str,
    config: &RouterConfig,
    shutdown: &CancellationToken,
) -> Result<ReceiverClient, RouterError> {
    let kind = EndpointKind::Listener;
    let negotiation = Negotiation::new(config, shutdown);

    let session = negotiation
        .step(connection.open_session())
        .await
        .map_err(|err| err.into_router_error(address, kind, NegotiationStage::Session))?;

    let attached = negotiation
        .step(session.open_receiver(address, config.link_credit))
        .await;
    let link = match attached {
        Ok(link) => link,
        Err(err) => {
            negotiation.release_session(address, kind, session).await;
            return Err(err.into_router_error(address, kind, NegotiationStage::Link));
        }
    };

    ReceiverClient::bind(address, session, link, negotiation.close_timeout).await
}
