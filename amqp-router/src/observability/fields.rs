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

//! Canonical structured field values and value-format helpers.

use crate::event::Event;

pub const NONE: &str = "none";
pub const REASON_NO_SUBSCRIBER: &str = "no_subscriber";
pub const REASON_DEADLINE_EXCEEDED: &str = "deadline_exceeded";
pub const REASON_NEGATIVE_ACK: &str = "negative_ack";
pub const REASON_SHUTDOWN: &str = "shutdown";
pub const REASON_COMMAND_BUS_CLOSED: &str = "command_bus_closed";

pub fn format_event_id(event: Option<&Event>) -> String {
    event
        .map(|event| event.id.clone())
        .unwrap_or_else(|| NONE.to_string())
}

pub fn format_event_type(event: Option<&Event>) -> String {
    event
        .map(|event| event.event_type.clone())
        .unwrap_or_else(|| NONE.to_string())
}

pub fn duration_ms(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
