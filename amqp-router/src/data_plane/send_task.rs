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

//! Deadline-bounded delivery of one event over one sender, and the
//! classification of its outcome into result bus statuses.

use crate::command::{RouterResult, Status};
use crate::data_plane::event_client::SenderClient;
use crate::data_plane::result_bus::ResultBus;
use crate::event::Event;
use crate::observability::{events, fields};
use crate::transport::DeliveryError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::error::Elapsed;
use tracing::{debug, warn};

const COMPONENT: &str = "send_task";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SendMode {
    Targeted,
    Broadcast,
}

impl SendMode {
    fn as_str(&self) -> &'static str {
        match self {
            SendMode::Targeted => "targeted",
            SendMode::Broadcast => "broadcast",
        }
    }
}

/// Classified outcome of one delivery attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Delivery {
    Accepted,
    Undelivered(String),
    Rejected(String),
    TimedOut,
}

impl Delivery {
    pub(crate) fn classify(outcome: Result<Result<(), DeliveryError>, Elapsed>) -> Self {
        match outcome {
            Ok(Ok(())) => Delivery::Accepted,
            Ok(Err(DeliveryError::Undelivered(reason))) => Delivery::Undelivered(reason),
            Ok(Err(DeliveryError::Rejected(reason))) => Delivery::Rejected(reason),
            Err(_) => Delivery::TimedOut,
        }
    }

    /// Status reported on the result bus; accepted deliveries report nothing.
    pub(crate) fn result_status(&self) -> Option<Status> {
        match self {
            Delivery::Accepted => None,
            Delivery::Undelivered(_) | Delivery::TimedOut => Some(Status::Failed),
            Delivery::Rejected(_) => Some(Status::Rejected),
        }
    }
}

pub(crate) struct SendTask {
    client: Arc<SenderClient>,
    event: Event,
    deadline: Duration,
    mode: SendMode,
    results: ResultBus,
}

impl SendTask {
    pub(crate) fn new(
        client: Arc<SenderClient>,
        event: Event,
        deadline: Duration,
        mode: SendMode,
        results: ResultBus,
    ) -> Self {
        Self {
            client,
            event,
            deadline,
            mode,
            results,
        }
    }

    pub(crate) async fn run(self) -> Delivery {
        let address = self.client.address();
        let outcome = tokio::time::timeout(self.deadline, self.client.send(&self.event)).await;
        let delivery = Delivery::classify(outcome);

        match &delivery {
            Delivery::Accepted => {
                debug!(
                    event = events::SEND_ACCEPTED,
                    component = COMPONENT,
                    address,
                    mode = self.mode.as_str(),
                    event_id = self.event.id.as_str(),
                    "event accepted"
                );
            }
            Delivery::Undelivered(reason) => {
                warn!(
                    event = events::SEND_UNDELIVERED,
                    component = COMPONENT,
                    address,
                    mode = self.mode.as_str(),
                    event_id = self.event.id.as_str(),
                    reason = fields::REASON_NO_SUBSCRIBER,
                    err = reason.as_str(),
                    "failed to send event"
                );
            }
            Delivery::Rejected(reason) => {
                warn!(
                    event = events::SEND_REJECTED,
                    component = COMPONENT,
                    address,
                    mode = self.mode.as_str(),
                    event_id = self.event.id.as_str(),
                    reason = fields::REASON_NEGATIVE_ACK,
                    err = reason.as_str(),
                    "event not accepted"
                );
            }
            Delivery::TimedOut => {
                warn!(
                    event = events::SEND_TIMED_OUT,
                    component = COMPONENT,
                    address,
                    mode = self.mode.as_str(),
                    event_id = self.event.id.as_str(),
                    deadline_ms = fields::duration_ms(self.deadline),
                    reason = fields::REASON_DEADLINE_EXCEEDED,
                    "failed to send event before deadline"
                );
            }
        }

        if let Some(status) = delivery.result_status() {
            self.results
                .publish(RouterResult::event(address, status, self.event.clone()));
        }

        delivery
    }
}
