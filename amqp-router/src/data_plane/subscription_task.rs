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

//! Long-lived receive loop owned by one listener.

use crate::command::{RouterResult, Status};
use crate::data_plane::event_client::ReceiverClient;
use crate::data_plane::result_bus::ResultBus;
use crate::event_handler::EventHandler;
use crate::observability::events;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Level};

const COMPONENT: &str = "subscription_task";

/// Why a subscription task stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SubscriptionExit {
    Cancelled,
    ReceiveFailed,
}

pub(crate) struct SubscriptionTask {
    client: ReceiverClient,
    handler: Arc<dyn EventHandler>,
    cancel: CancellationToken,
    results: ResultBus,
}

impl SubscriptionTask {
    pub(crate) fn new(
        client: ReceiverClient,
        handler: Arc<dyn EventHandler>,
        cancel: CancellationToken,
        results: ResultBus,
    ) -> Self {
        Self {
            client,
            handler,
            cancel,
            results,
        }
    }

    /// Receives until cancelled or the link fails, then closes the client.
    pub(crate) async fn run(mut self) -> SubscriptionExit {
        let address = self.client.address().to_string();
        debug!(
            event = events::SUBSCRIPTION_START,
            component = COMPONENT,
            address = address.as_str(),
            "subscription started"
        );

        let exit = loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break SubscriptionExit::Cancelled,
                received = self.client.receive() => received,
            };

            let event = match received {
                Ok(event) => event,
                Err(err) => {
                    if self.cancel.is_cancelled() {
                        break SubscriptionExit::Cancelled;
                    }
                    warn!(
                        event = events::SUBSCRIPTION_RECEIVE_FAILED,
                        component = COMPONENT,
                        address = address.as_str(),
                        err = %err,
                        "receive failed; stopping subscription"
                    );
                    self.results.publish(RouterResult::listener_failed(&address));
                    break SubscriptionExit::ReceiveFailed;
                }
            };

            if tracing::enabled!(Level::DEBUG) {
                debug!(
                    event = events::SUBSCRIPTION_RECEIVE,
                    component = COMPONENT,
                    address = address.as_str(),
                    event_id = event.id.as_str(),
                    event_type = event.event_type.as_str(),
                    "received event"
                );
            }

            let status = match self.handler.on_receive(&event).await {
                Ok(()) => Status::Succeed,
                Err(err) => {
                    warn!(
                        event = events::SUBSCRIPTION_HANDLER_FAILED,
                        component = COMPONENT,
                        address = address.as_str(),
                        event_id = event.id.as_str(),
                        err = %err,
                        "handler failed to process event"
                    );
                    Status::Failed
                }
            };
            self.results
                .publish(RouterResult::event(&address, status, event));
        };

        if exit == SubscriptionExit::Cancelled {
            debug!(
                event = events::SUBSCRIPTION_CANCELLED,
                component = COMPONENT,
                address = address.as_str(),
                "subscription cancelled"
            );
        }

        self.client.close().await;
        exit
    }
}
