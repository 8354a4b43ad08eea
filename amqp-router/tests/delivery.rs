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

mod support;

use amqp_router::{Command, CommandAck, EndpointKind, Event, RouterConfig, Status};
use in_memory_broker::InMemoryBroker;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn event_without_listener_yields_one_failed_result_within_two_seconds() {
    support::init_logging();
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router_with(
        "undelivered",
        &broker,
        RouterConfig::new("amqp://in-memory"),
    );
    let mut results = handle.subscribe();
    let event = Event::new("ptp.status", "/cluster/node1");

    handle.submit(Command::create_sender("a1")).unwrap();
    handle.submit(Command::event("a1", event.clone())).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), results.recv())
        .await
        .expect("failure should be reported within the send deadline")
        .unwrap();
    assert_eq!(result.address, "a1");
    assert_eq!(result.kind, EndpointKind::Event);
    assert_eq!(result.status, Status::Failed);
    assert_eq!(result.payload, Some(event));

    support::assert_no_result(&mut results, Duration::from_millis(200)).await;
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn negative_ack_is_reported_as_rejected() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("rejected", &broker);
    let mut results = handle.subscribe();
    let _subscriber = broker.probe("a1", 8).await;
    broker.reject_address("a1").await;

    handle.execute(Command::create_sender("a1")).await.unwrap();
    assert_eq!(
        handle
            .execute(Command::event("a1", Event::new("t", "s")))
            .await
            .unwrap(),
        CommandAck::Dispatched
    );

    let result = support::next_result(&mut results).await;
    assert_eq!(result.status, Status::Rejected);
    assert_eq!(result.address, "a1");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn accepted_delivery_emits_no_result() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("accepted", &broker);
    let mut results = handle.subscribe();
    let mut subscriber = broker.probe("a1", 8).await;
    let event = Event::new("t", "s");

    handle.execute(Command::create_sender("a1")).await.unwrap();
    handle.submit(Command::event("a1", event.clone())).unwrap();

    let delivered = tokio::time::timeout(support::RESULT_WAIT, subscriber.recv())
        .await
        .unwrap();
    assert_eq!(delivered, Some(event));
    support::assert_no_result(&mut results, Duration::from_millis(200)).await;

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn event_for_unknown_sender_is_dropped_silently() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("no-sender", &broker);
    let mut results = handle.subscribe();

    assert_eq!(
        handle
            .execute(Command::event("nowhere", Event::new("t", "s")))
            .await
            .unwrap(),
        CommandAck::NoSender
    );

    support::assert_no_result(&mut results, Duration::from_millis(200)).await;
    assert_eq!(broker.stats().sessions_opened, 0);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn send_past_deadline_is_failed() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("deadline", &broker);
    let mut results = handle.subscribe();
    let _subscriber = broker.probe("slow", 8).await;
    broker.delay_address("slow", Duration::from_secs(5)).await;

    handle.execute(Command::create_sender("slow")).await.unwrap();
    handle
        .submit(Command::event("slow", Event::new("t", "s")))
        .unwrap();

    // The test config uses a 500ms targeted deadline.
    let result = tokio::time::timeout(Duration::from_secs(2), results.recv())
        .await
        .expect("deadline failure should arrive")
        .unwrap();
    assert_eq!(result.status, Status::Failed);
    assert_eq!(result.address, "slow");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn delivery_failure_on_one_address_does_not_affect_another() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("isolation", &broker);
    let mut results = handle.subscribe();
    let mut healthy = broker.probe("healthy", 8).await;

    handle.execute(Command::create_sender("healthy")).await.unwrap();
    handle.execute(Command::create_sender("orphan")).await.unwrap();
    handle
        .submit(Command::event("orphan", Event::new("t", "s")))
        .unwrap();
    handle
        .submit(Command::event("healthy", Event::new("t", "s")))
        .unwrap();

    let result = support::next_result(&mut results).await;
    assert_eq!(result.address, "orphan");
    assert_eq!(result.status, Status::Failed);
    assert!(tokio::time::timeout(support::RESULT_WAIT, healthy.recv())
        .await
        .unwrap()
        .is_some());
    support::assert_no_result(&mut results, Duration::from_millis(200)).await;

    handle.shutdown().await.unwrap();
}
