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

//! In-process broker implementing the `amqp-router` transport traits.
//!
//! Every receiver link attached to an address gets a copy of each event sent
//! to that address. A send with no attached receiver is undelivered. Failures
//! are injected per address so tests can exercise rejection, slow delivery and
//! failed negotiation without a real broker.

use amqp_router::{
    Connection, DeliveryError, Event, ReceiverLink, SenderLink, Session, TransportError,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Open and close calls observed by the broker. Close calls are counted on
/// every invocation so double closes show up.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BrokerStats {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub senders_opened: usize,
    pub senders_closed: usize,
    pub receivers_opened: usize,
    pub receivers_closed: usize,
}

#[derive(Default)]
struct Counters {
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    senders_opened: AtomicUsize,
    senders_closed: AtomicUsize,
    receivers_opened: AtomicUsize,
    receivers_closed: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> BrokerStats {
        BrokerStats {
            sessions_opened: self.sessions_opened.load(Ordering::SeqCst),
            sessions_closed: self.sessions_closed.load(Ordering::SeqCst),
            senders_opened: self.senders_opened.load(Ordering::SeqCst),
            senders_closed: self.senders_closed.load(Ordering::SeqCst),
            receivers_opened: self.receivers_opened.load(Ordering::SeqCst),
            receivers_closed: self.receivers_closed.load(Ordering::SeqCst),
        }
    }
}

#[derive(Default)]
struct Faults {
    failing_sessions: usize,
    failing_sender_attach: HashSet<String>,
    failing_receiver_attach: HashSet<String>,
    detached_on_attach: HashSet<String>,
    rejected: HashSet<String>,
    delays: HashMap<String, Duration>,
}

#[derive(Default)]
struct BrokerState {
    subscribers: Mutex<HashMap<String, Vec<(u64, mpsc::Sender<Event>)>>>,
    faults: Mutex<Faults>,
    counters: Counters,
    next_subscriber_id: AtomicU64,
}

impl BrokerState {
    async fn subscribe(&self, address: &str, credit: usize) -> (u64, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(credit.max(1));
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .lock()
            .await
            .entry(address.to_string())
            .or_default()
            .push((id, sender));
        (id, receiver)
    }

    async fn unsubscribe(&self, address: &str, id: u64) {
        let mut subscribers = self.subscribers.lock().await;
        if let Some(entries) = subscribers.get_mut(address) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                subscribers.remove(address);
            }
        }
    }

    /// Copies `event` to every live subscriber of `address`, waiting for
    /// credit where a subscriber is full.
    async fn deliver(&self, address: &str, event: &Event) -> Result<usize, DeliveryError> {
        let targets: Vec<mpsc::Sender<Event>> = self
            .subscribers
            .lock()
            .await
            .get(address)
            .map(|entries| entries.iter().map(|(_, sender)| sender.clone()).collect())
            .unwrap_or_default();

        let mut delivered = 0;
        for target in targets {
            if target.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered == 0 {
            debug!(address, event_id = event.id.as_str(), "no subscriber reachable");
            return Err(DeliveryError::Undelivered(format!(
                "no subscriber attached to {address}"
            )));
        }
        Ok(delivered)
    }
}

/// Shared handle to one broker instance. Clones observe the same state.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BrokerStats {
        self.state.counters.snapshot()
    }

    /// Delivers an event as if an external publisher sent it to `address`.
    /// Returns the number of receivers reached.
    pub async fn publish(&self, address: &str, event: Event) -> Result<usize, DeliveryError> {
        self.state.deliver(address, &event).await
    }

    /// Attaches an external subscriber outside any session.
    pub async fn probe(&self, address: &str, credit: usize) -> mpsc::Receiver<Event> {
        let (_, receiver) = self.state.subscribe(address, credit).await;
        receiver
    }

    /// Number of receivers currently attached to `address`, probes included.
    pub async fn subscriber_count(&self, address: &str) -> usize {
        self.state
            .subscribers
            .lock()
            .await
            .get(address)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Drops every receiver registration on `address`; attached receiver
    /// links observe a detach on their next receive.
    pub async fn detach_receivers(&self, address: &str) {
        self.state.subscribers.lock().await.remove(address);
    }

    /// Answers every send to `address` with a negative acknowledgement.
    pub async fn reject_address(&self, address: &str) {
        self.state
            .faults
            .lock()
            .await
            .rejected
            .insert(address.to_string());
    }

    /// Holds every send to `address` for `delay` before settling it.
    pub async fn delay_address(&self, address: &str, delay: Duration) {
        self.state
            .faults
            .lock()
            .await
            .delays
            .insert(address.to_string(), delay);
    }

    /// Refuses the next `count` session negotiations.
    pub async fn fail_next_sessions(&self, count: usize) {
        self.state.faults.lock().await.failing_sessions = count;
    }

    pub async fn fail_sender_attach(&self, address: &str) {
        self.state
            .faults
            .lock()
            .await
            .failing_sender_attach
            .insert(address.to_string());
    }

    pub async fn fail_receiver_attach(&self, address: &str) {
        self.state
            .faults
            .lock()
            .await
            .failing_receiver_attach
            .insert(address.to_string());
    }

    /// Links attached to `address` come back already detached by the peer.
    pub async fn detach_on_attach(&self, address: &str) {
        self.state
            .faults
            .lock()
            .await
            .detached_on_attach
            .insert(address.to_string());
    }

    /// Removes every injected fault for `address`.
    pub async fn heal(&self, address: &str) {
        let mut faults = self.state.faults.lock().await;
        faults.failing_sender_attach.remove(address);
        faults.failing_receiver_attach.remove(address);
        faults.detached_on_attach.remove(address);
        faults.rejected.remove(address);
        faults.delays.remove(address);
    }
}

#[async_trait]
impl Connection for InMemoryBroker {
    async fn open_session(&self) -> Result<Box<dyn Session>, TransportError> {
        {
            let mut faults = self.state.faults.lock().await;
            if faults.failing_sessions > 0 {
                faults.failing_sessions -= 1;
                return Err(TransportError::Session("session refused by broker".to_string()));
            }
        }

        Counters::bump(&self.state.counters.sessions_opened);
        Ok(Box::new(BrokerSession {
            state: self.state.clone(),
        }))
    }
}

struct BrokerSession {
    state: Arc<BrokerState>,
}

#[async_trait]
impl Session for BrokerSession {
    async fn open_sender(&self, address: &str) -> Result<Box<dyn SenderLink>, TransportError> {
        let detached = {
            let faults = self.state.faults.lock().await;
            if faults.failing_sender_attach.contains(address) {
                return Err(TransportError::Link(format!(
                    "sender attach refused for {address}"
                )));
            }
            faults.detached_on_attach.contains(address)
        };

        Counters::bump(&self.state.counters.senders_opened);
        debug!(address, "sender link attached");
        Ok(Box::new(BrokerSenderLink {
            address: address.to_string(),
            state: self.state.clone(),
            attached: !detached,
            closed: AtomicBool::new(false),
        }))
    }

    async fn open_receiver(
        &self,
        address: &str,
        link_credit: u32,
    ) -> Result<Box<dyn ReceiverLink>, TransportError> {
        let detached = {
            let faults = self.state.faults.lock().await;
            if faults.failing_receiver_attach.contains(address) {
                return Err(TransportError::Link(format!(
                    "receiver attach refused for {address}"
                )));
            }
            faults.detached_on_attach.contains(address)
        };

        let (id, receiver) = self
            .state
            .subscribe(address, usize::try_from(link_credit).unwrap_or(usize::MAX))
            .await;
        Counters::bump(&self.state.counters.receivers_opened);
        debug!(address, link_credit, "receiver link attached");
        Ok(Box::new(BrokerReceiverLink {
            address: address.to_string(),
            id,
            receiver,
            state: self.state.clone(),
            attached: !detached,
        }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        Counters::bump(&self.state.counters.sessions_closed);
        Ok(())
    }
}

struct BrokerSenderLink {
    address: String,
    state: Arc<BrokerState>,
    attached: bool,
    closed: AtomicBool,
}

#[async_trait]
impl SenderLink for BrokerSenderLink {
    fn is_attached(&self) -> bool {
        self.attached && !self.closed.load(Ordering::Acquire)
    }

    async fn send(&self, event: &Event) -> Result<(), DeliveryError> {
        if !self.is_attached() {
            return Err(DeliveryError::Undelivered(
                TransportError::Closed.to_string(),
            ));
        }

        let (delay, rejected) = {
            let faults = self.state.faults.lock().await;
            (
                faults.delays.get(&self.address).copied(),
                faults.rejected.contains(&self.address),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if rejected {
            debug!(
                address = self.address.as_str(),
                event_id = event.id.as_str(),
                "rejecting event"
            );
            return Err(DeliveryError::Rejected(format!(
                "subscriber on {} declined the event",
                self.address
            )));
        }

        self.state.deliver(&self.address, event).await.map(|_| ())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Counters::bump(&self.state.counters.senders_closed);
        Ok(())
    }
}

struct BrokerReceiverLink {
    address: String,
    id: u64,
    receiver: mpsc::Receiver<Event>,
    state: Arc<BrokerState>,
    attached: bool,
}

#[async_trait]
impl ReceiverLink for BrokerReceiverLink {
    fn is_attached(&self) -> bool {
        self.attached
    }

    async fn receive(&mut self) -> Result<Event, TransportError> {
        self.receiver.recv().await.ok_or_else(|| {
            TransportError::Detached(format!("broker dropped receiver on {}", self.address))
        })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.receiver.close();
        self.state.unsubscribe(&self.address, self.id).await;
        Counters::bump(&self.state.counters.receivers_closed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryBroker;
    use amqp_router::{Connection, DeliveryError, Event, TransportError};
    use std::time::Duration;

    #[tokio::test]
    async fn send_without_subscriber_is_undelivered() {
        let broker = InMemoryBroker::new();
        let session = broker.open_session().await.unwrap();
        let link = session.open_sender("a1").await.unwrap();

        assert!(matches!(
            link.send(&Event::new("t", "s")).await,
            Err(DeliveryError::Undelivered(_))
        ));
    }

    #[tokio::test]
    async fn every_receiver_gets_a_copy() {
        let broker = InMemoryBroker::new();
        let session = broker.open_session().await.unwrap();
        let mut first = session.open_receiver("a1", 4).await.unwrap();
        let mut probe = broker.probe("a1", 4).await;
        let event = Event::new("t", "s");

        assert_eq!(broker.publish("a1", event.clone()).await.unwrap(), 2);
        assert_eq!(first.receive().await.unwrap(), event);
        assert_eq!(probe.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn closed_receiver_stops_counting_as_subscriber() {
        let broker = InMemoryBroker::new();
        let session = broker.open_session().await.unwrap();
        let mut receiver = session.open_receiver("a1", 4).await.unwrap();
        assert_eq!(broker.subscriber_count("a1").await, 1);

        receiver.close().await.unwrap();
        session.close().await.unwrap();

        assert_eq!(broker.subscriber_count("a1").await, 0);
        let stats = broker.stats();
        assert_eq!(stats.receivers_closed, 1);
        assert_eq!(stats.sessions_closed, 1);
    }

    #[tokio::test]
    async fn injected_faults_apply_per_address() {
        let broker = InMemoryBroker::new();
        broker.fail_next_sessions(1).await;
        assert!(matches!(
            broker.open_session().await.err(),
            Some(TransportError::Session(_))
        ));

        let session = broker.open_session().await.unwrap();
        broker.fail_sender_attach("a1").await;
        assert!(session.open_sender("a1").await.is_err());
        assert!(session.open_sender("a2").await.is_ok());

        broker.detach_on_attach("a3").await;
        assert!(!session.open_sender("a3").await.unwrap().is_attached());

        broker.heal("a1").await;
        assert!(session.open_sender("a1").await.is_ok());
    }

    #[tokio::test]
    async fn rejected_address_answers_with_negative_ack() {
        let broker = InMemoryBroker::new();
        let _probe = broker.probe("a1", 1).await;
        broker.reject_address("a1").await;
        broker.delay_address("a1", Duration::from_millis(5)).await;

        let session = broker.open_session().await.unwrap();
        let link = session.open_sender("a1").await.unwrap();

        assert!(matches!(
            link.send(&Event::new("t", "s")).await,
            Err(DeliveryError::Rejected(_))
        ));
    }
}
