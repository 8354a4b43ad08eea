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

use amqp_router::{handler_fn, Command, CommandAck, DeliveryError, EndpointKind, Event, Status};
use in_memory_broker::InMemoryBroker;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn external_event_round_trips_as_succeed() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("round-trip", &broker);
    let mut results = handle.subscribe();

    handle.execute(Command::create_listener("x")).await.unwrap();
    let event = Event::new("ptp.status", "/cluster/node1")
        .with_data(&serde_json::json!({ "state": "LOCKED" }))
        .unwrap();
    broker.publish("x", event.clone()).await.unwrap();

    let result = support::next_result(&mut results).await;
    assert_eq!(result.address, "x");
    assert_eq!(result.kind, EndpointKind::Event);
    assert_eq!(result.status, Status::Succeed);
    assert_eq!(result.payload, Some(event));
    support::assert_no_result(&mut results, Duration::from_millis(200)).await;

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn router_sender_reaches_router_listener() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("loopback", &broker);
    let mut results = handle.subscribe();

    handle.execute(Command::create_listener("loop")).await.unwrap();
    handle.execute(Command::create_sender("loop")).await.unwrap();
    let event = Event::new("t", "s");
    handle.submit(Command::event("loop", event.clone())).unwrap();

    // Only the listener reports; the accepted send stays silent.
    let result = support::next_result(&mut results).await;
    assert_eq!(result.status, Status::Succeed);
    assert_eq!(result.payload, Some(event));
    support::assert_no_result(&mut results, Duration::from_millis(200)).await;

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn handler_outcome_classifies_each_event() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("handler", &broker);
    let mut results = handle.subscribe();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorder = seen.clone();
    let handler = handler_fn(move |event: &Event| {
        recorder.lock().unwrap().push(event.id.clone());
        anyhow::ensure!(event.has_data(), "event {} has no data", event.id);
        Ok(())
    });
    handle
        .execute(Command::create_listener_with("h", Arc::new(handler)))
        .await
        .unwrap();

    let bare = Event::new("t", "s");
    let with_data = Event::new("t", "s").with_data(&42).unwrap();
    broker.publish("h", bare.clone()).await.unwrap();
    broker.publish("h", with_data.clone()).await.unwrap();

    let first = support::next_result(&mut results).await;
    assert_eq!(first.status, Status::Failed);
    assert_eq!(first.payload, Some(bare.clone()));
    let second = support::next_result(&mut results).await;
    assert_eq!(second.status, Status::Succeed);
    assert_eq!(second.payload, Some(with_data.clone()));

    assert_eq!(*seen.lock().unwrap(), vec![bare.id, with_data.id]);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn events_are_reported_in_arrival_order() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("ordering", &broker);
    let mut results = handle.subscribe();
    handle.execute(Command::create_listener("x")).await.unwrap();

    let events: Vec<Event> = (0..5).map(|_| Event::new("t", "s")).collect();
    for event in &events {
        broker.publish("x", event.clone()).await.unwrap();
    }

    for expected in events {
        assert_eq!(
            support::next_result(&mut results).await.payload,
            Some(expected)
        );
    }
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn delete_stops_delivery() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("delete-listener", &broker);
    let mut results = handle.subscribe();

    handle.execute(Command::create_listener("x")).await.unwrap();
    assert_eq!(
        handle.execute(Command::delete_listener("x")).await.unwrap(),
        CommandAck::Deleted
    );
    support::wait_for_subscribers(&broker, "x", 0).await;

    assert!(matches!(
        broker.publish("x", Event::new("t", "s")).await,
        Err(DeliveryError::Undelivered(_))
    ));
    support::assert_no_result(&mut results, Duration::from_millis(200)).await;

    let stats = broker.stats();
    assert_eq!(stats.receivers_closed, 1);
    assert_eq!(stats.sessions_closed, 1);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn detached_receiver_reports_listener_failure_and_keeps_entry() {
    let broker = Arc::new(InMemoryBroker::new());
    let handle = support::start_router("detached", &broker);
    let mut results = handle.subscribe();

    handle.execute(Command::create_listener("x")).await.unwrap();
    broker.detach_receivers("x").await;

    let result = support::next_result(&mut results).await;
    assert_eq!(result.address, "x");
    assert_eq!(result.kind, EndpointKind::Listener);
    assert_eq!(result.status, Status::Failed);
    assert!(result.payload.is_none());

    assert_eq!(
        handle.endpoints().await.unwrap().listeners,
        vec!["x".to_string()]
    );
    assert_eq!(
        handle.execute(Command::delete_listener("x")).await.unwrap(),
        CommandAck::Deleted
    );
    // Recreating attaches a fresh receiver.
    assert_eq!(
        handle.execute(Command::create_listener("x")).await.unwrap(),
        CommandAck::Created
    );
    support::wait_for_subscribers(&broker, "x", 1).await;

    handle.shutdown().await.unwrap();
    assert_eq!(broker.stats().receivers_closed, 2);
}
