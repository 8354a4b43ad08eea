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

//! Endpoint maps owned exclusively by the dispatch loop.

use crate::command::EndpointSnapshot;
use crate::data_plane::event_client::SenderClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A live sender. Send tasks hold clones of the client while in flight.
pub(crate) struct SenderEndpoint {
    pub(crate) client: Arc<SenderClient>,
}

/// A live listener, stopped by cancelling its token.
pub(crate) struct ListenerEndpoint {
    pub(crate) cancel: CancellationToken,
}

/// At most one sender and one listener per address.
#[derive(Default)]
pub(crate) struct EndpointTable {
    senders: HashMap<String, SenderEndpoint>,
    listeners: HashMap<String, ListenerEndpoint>,
}

impl EndpointTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn has_sender(&self, address: &str) -> bool {
        self.senders.contains_key(address)
    }

    pub(crate) fn has_listener(&self, address: &str) -> bool {
        self.listeners.contains_key(address)
    }

    pub(crate) fn sender(&self, address: &str) -> Option<Arc<SenderClient>> {
        self.senders
            .get(address)
            .map(|endpoint| endpoint.client.clone())
    }

    /// Every sender client, in no particular order.
    pub(crate) fn senders(&self) -> Vec<Arc<SenderClient>> {
        self.senders
            .values()
            .map(|endpoint| endpoint.client.clone())
            .collect()
    }

    /// Inserts a sender. Returns `false` when the address already had one.
    pub(crate) fn insert_sender(&mut self, address: &str, client: Arc<SenderClient>) -> bool {
        if self.senders.contains_key(address) {
            return false;
        }
        self.senders
            .insert(address.to_string(), SenderEndpoint { client });
        true
    }

    pub(crate) fn insert_listener(&mut self, address: &str, cancel: CancellationToken) -> bool {
        if self.listeners.contains_key(address) {
            return false;
        }
        self.listeners
            .insert(address.to_string(), ListenerEndpoint { cancel });
        true
    }

    pub(crate) fn remove_sender(&mut self, address: &str) -> Option<SenderEndpoint> {
        self.senders.remove(address)
    }

    pub(crate) fn remove_listener(&mut self, address: &str) -> Option<ListenerEndpoint> {
        self.listeners.remove(address)
    }

    /// Empties both maps, handing back what they held.
    pub(crate) fn drain(&mut self) -> (Vec<SenderEndpoint>, Vec<ListenerEndpoint>) {
        (
            self.senders.drain().map(|(_, endpoint)| endpoint).collect(),
            self.listeners
                .drain()
                .map(|(_, endpoint)| endpoint)
                .collect(),
        )
    }

    pub(crate) fn snapshot(&self) -> EndpointSnapshot {
        let mut senders: Vec<String> = self.senders.keys().cloned().collect();
        let mut listeners: Vec<String> = self.listeners.keys().cloned().collect();
        senders.sort();
        listeners.sort();
        EndpointSnapshot { senders, listeners }
    }
}
