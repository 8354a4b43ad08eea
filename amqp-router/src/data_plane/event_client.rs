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

//! Event clients binding one session and one link to an address.

use crate::command::EndpointKind;
use crate::error::RouterError;
use crate::event::Event;
use crate::observability::events;
use crate::transport::{DeliveryError, ReceiverLink, SenderLink, Session, TransportError};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

const COMPONENT: &str = "event_client";

/// Runs one close call, turning an unanswered close into `TimedOut`.
pub(crate) async fn close_within(
    deadline: Duration,
    close: impl Future<Output = Result<(), TransportError>>,
) -> Result<(), TransportError> {
    tokio::time::timeout(deadline, close)
        .await
        .unwrap_or(Err(TransportError::TimedOut(deadline)))
}

async fn close_session(
    address: &str,
    kind: EndpointKind,
    session: &dyn Session,
    deadline: Duration,
) {
    if let Err(err) = close_within(deadline, session.close()).await {
        warn!(
            event = events::SESSION_CLOSE_FAILED,
            component = COMPONENT,
            address,
            kind = kind.as_str(),
            err = %err,
            "unable to close session"
        );
    }
}

fn log_sender_close_failure(address: &str, err: &TransportError) {
    warn!(
        event = events::SENDER_CLOSE_FAILED,
        component = COMPONENT,
        address,
        err = %err,
        "unable to close sender link"
    );
}

fn log_receiver_close_failure(address: &str, err: &TransportError) {
    warn!(
        event = events::SUBSCRIPTION_CLOSE_FAILED,
        component = COMPONENT,
        address,
        err = %err,
        "unable to close receiver link"
    );
}

fn detached(address: &str, kind: EndpointKind) -> RouterError {
    RouterError::ClientConstruction {
        address: address.to_string(),
        kind,
        reason: "link was detached by the peer before the client was bound".to_string(),
    }
}

/// Sending side of an endpoint. Shared read-only with in-flight send tasks.
pub(crate) struct SenderClient {
    address: String,
    session: Box<dyn Session>,
    link: Box<dyn SenderLink>,
    close_timeout: Duration,
    closed: AtomicBool,
}

impl SenderClient {
    /// Binds a freshly attached link, releasing it when it is unusable.
    ///
    /// Every later close call is bounded by `close_timeout`.
    pub(crate) async fn bind(
        address: &str,
        session: Box<dyn Session>,
        link: Box<dyn SenderLink>,
        close_timeout: Duration,
    ) -> Result<Self, RouterError> {
        if !link.is_attached() {
            if let Err(err) = close_within(close_timeout, link.close()).await {
                log_sender_close_failure(address, &err);
            }
            close_session(address, EndpointKind::Sender, session.as_ref(), close_timeout).await;
            return Err(detached(address, EndpointKind::Sender));
        }

        Ok(Self {
            address: address.to_string(),
            session,
            link,
            close_timeout,
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    pub(crate) async fn send(&self, event: &Event) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DeliveryError::Undelivered(TransportError::Closed.to_string()));
        }
        self.link.send(event).await
    }

    /// Closes the link and its session. Later calls are no-ops.
    pub(crate) async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Err(err) = close_within(self.close_timeout, self.link.close()).await {
            log_sender_close_failure(&self.address, &err);
        }
        close_session(
            &self.address,
            EndpointKind::Sender,
            self.session.as_ref(),
            self.close_timeout,
        )
        .await;
    }
}

/// Receiving side of a listener, owned by its subscription task.
pub(crate) struct ReceiverClient {
    address: String,
    session: Box<dyn Session>,
    link: Box<dyn ReceiverLink>,
    close_timeout: Duration,
}

impl ReceiverClient {
    pub(crate) async fn bind(
        address: &str,
        session: Box<dyn Session>,
        mut link: Box<dyn ReceiverLink>,
        close_timeout: Duration,
    ) -> Result<Self, RouterError> {
        if !link.is_attached() {
            if let Err(err) = close_within(close_timeout, link.close()).await {
                log_receiver_close_failure(address, &err);
            }
            close_session(address, EndpointKind::Listener, session.as_ref(), close_timeout).await;
            return Err(detached(address, EndpointKind::Listener));
        }

        Ok(Self {
            address: address.to_string(),
            session,
            link,
            close_timeout,
        })
    }

    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    pub(crate) async fn receive(&mut self) -> Result<Event, TransportError> {
        self.link.receive().await
    }

    pub(crate) async fn close(mut self) {
        if let Err(err) = close_within(self.close_timeout, self.link.close()).await {
            log_receiver_close_failure(&self.address, &err);
        }
        close_session(
            &self.address,
            EndpointKind::Listener,
            self.session.as_ref(),
            self.close_timeout,
        )
        .await;
    }
}

#[cfg(test)]
pub(crate) mod test_links {
    //! Scripted links shared by data-plane unit tests.

    use crate::event::Event;
    use crate::transport::{
        DeliveryError, ReceiverLink, SenderLink, Session, TransportError,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    pub(crate) const CLOSE_TIMEOUT: Duration = Duration::from_millis(200);

    #[derive(Default)]
    pub(crate) struct Counters {
        pub(crate) link_closes: AtomicUsize,
        pub(crate) session_closes: AtomicUsize,
        pub(crate) sends: AtomicUsize,
    }

    pub(crate) struct CountingSession {
        pub(crate) counters: Arc<Counters>,
    }

    #[async_trait]
    impl Session for CountingSession {
        async fn open_sender(
            &self,
            _address: &str,
        ) -> Result<Box<dyn SenderLink>, TransportError> {
            Err(TransportError::Link("not used".to_string()))
        }

        async fn open_receiver(
            &self,
            _address: &str,
            _link_credit: u32,
        ) -> Result<Box<dyn ReceiverLink>, TransportError> {
            Err(TransportError::Link("not used".to_string()))
        }

        async fn close(&self) -> Result<(), TransportError> {
            self.counters.session_closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Sender link answering every send with a fixed outcome after `delay`.
    pub(crate) struct ScriptedSenderLink {
        pub(crate) attached: bool,
        pub(crate) delay: Duration,
        pub(crate) outcome: Result<(), DeliveryError>,
        pub(crate) counters: Arc<Counters>,
    }

    #[async_trait]
    impl SenderLink for ScriptedSenderLink {
        fn is_attached(&self) -> bool {
            self.attached
        }

        async fn send(&self, _event: &Event) -> Result<(), DeliveryError> {
            self.counters.sends.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }

        async fn close(&self) -> Result<(), TransportError> {
            self.counters.link_closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Receiver link fed from an mpsc channel; a closed channel detaches it.
    pub(crate) struct ChannelReceiverLink {
        pub(crate) receiver: mpsc::UnboundedReceiver<Event>,
        pub(crate) counters: Arc<Counters>,
    }

    #[async_trait]
    impl ReceiverLink for ChannelReceiverLink {
        fn is_attached(&self) -> bool {
            true
        }

        async fn receive(&mut self) -> Result<Event, TransportError> {
            self.receiver
                .recv()
                .await
                .ok_or_else(|| TransportError::Detached("feed closed".to_string()))
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.counters.link_closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub(crate) fn session(counters: &Arc<Counters>) -> Box<dyn Session> {
        Box::new(CountingSession {
            counters: counters.clone(),
        })
    }

    pub(crate) fn sender_link(
        counters: &Arc<Counters>,
        delay: Duration,
        outcome: Result<(), DeliveryError>,
    ) -> Box<dyn SenderLink> {
        Box::new(ScriptedSenderLink {
            attached: true,
            delay,
            outcome,
            counters: counters.clone(),
        })
    }
}
