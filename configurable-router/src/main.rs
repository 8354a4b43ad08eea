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

mod config;

use crate::config::DemoConfig;
use amqp_router::{Command, Event, Router, RouterHandle, RouterResult};
use anyhow::Context;
use clap::Parser;
use in_memory_broker::InMemoryBroker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command()]
struct RouterArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    info!("Started configurable-router");

    let args = RouterArgs::parse();
    let config = DemoConfig::from_file(&args.config)
        .with_context(|| format!("unable to load config file {}", args.config))?;

    let broker = Arc::new(InMemoryBroker::new());
    let handle = Router::new("configurable-router", config.router.clone(), broker.clone()).start();
    let results = tokio::spawn(log_results(handle.subscribe()));

    for address in &config.listeners {
        let ack = handle
            .execute(Command::create_listener(address))
            .await
            .with_context(|| format!("could not create listener for {address}"))?;
        info!(address = address.as_str(), ?ack, "listener ready");
    }
    for address in &config.senders {
        let ack = handle
            .execute(Command::create_sender(address))
            .await
            .with_context(|| format!("could not create sender for {address}"))?;
        info!(address = address.as_str(), ?ack, "sender ready");
    }

    publish_demo_events(&handle, &config).await?;

    if config.run_for_secs == 0 {
        tokio::signal::ctrl_c()
            .await
            .context("unable to listen for ctrl-c")?;
    } else {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = tokio::time::sleep(Duration::from_secs(config.run_for_secs)) => {}
        }
    }

    handle.shutdown().await?;
    results.abort();

    let stats = broker.stats();
    info!(
        sessions_opened = stats.sessions_opened,
        sessions_closed = stats.sessions_closed,
        "Stopped configurable-router"
    );

    Ok(())
}

async fn publish_demo_events(handle: &RouterHandle, config: &DemoConfig) -> anyhow::Result<()> {
    for sequence in 0..config.events_per_sender {
        for address in &config.senders {
            let event = Event::new("event.demo.status", "/configurable-router")
                .with_data(&serde_json::json!({ "address": address, "sequence": sequence }))?;
            handle.submit(Command::event(address, event))?;
        }
    }

    let fanout = handle
        .broadcast(Event::new("event.demo.heartbeat", "/configurable-router"))
        .await?;
    info!(fanout, "heartbeat broadcast dispatched");
    Ok(())
}

async fn log_results(mut results: broadcast::Receiver<RouterResult>) {
    loop {
        match results.recv().await {
            Ok(result) => log_result(&result),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "result subscriber lagged; results were dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_result(result: &RouterResult) {
    info!(
        address = result.address.as_str(),
        kind = result.kind.as_str(),
        status = result.status.as_str(),
        event_id = result
            .payload
            .as_ref()
            .map(|event| event.id.as_str())
            .unwrap_or("none"),
        "result"
    );
}
