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

//! CloudEvents-style envelope carried over sender and receiver links.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const SPEC_VERSION: &str = "0.3";
pub const APPLICATION_JSON: &str = "application/json";

/// Failures building or decoding an [`Event`] payload.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event data is empty")]
    EmptyData,
    #[error("unable to encode event data: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unable to decode event data: {0}")]
    Decode(#[source] serde_json::Error),
}

/// An event routed between the command bus and the transport.
///
/// The envelope is opaque to the router: it is forwarded as-is and only its
/// identity fields are used for logging.
///
/// ```
/// use amqp_router::Event;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct PtpStatus {
///     state: String,
/// }
///
/// let event = Event::new("event.sync.ptp-status", "/cluster/node1/ptp")
///     .with_data(&PtpStatus { state: "LOCKED".to_string() })
///     .unwrap();
///
/// let status: PtpStatus = event.data_as().unwrap();
/// assert_eq!(status.state, "LOCKED");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub spec_version: String,
    pub time: DateTime<Utc>,
    pub data_content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    /// Creates an event with a fresh id and the current time and no data.
    pub fn new(event_type: &str, source: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            source: source.to_string(),
            spec_version: SPEC_VERSION.to_string(),
            time: Utc::now(),
            data_content_type: APPLICATION_JSON.to_string(),
            data: None,
        }
    }

    /// Attaches a JSON-serialisable payload.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Result<Self, EventError> {
        self.data = Some(serde_json::to_value(data).map_err(EventError::Encode)?);
        Ok(self)
    }

    /// Decodes the payload into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, EventError> {
        let Some(data) = self.data.as_ref() else {
            return Err(EventError::EmptyData);
        };
        serde_json::from_value(data.clone()).map_err(EventError::Decode)
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, EventError, APPLICATION_JSON, SPEC_VERSION};
    use serde_json::json;

    #[test]
    fn new_event_has_identity_and_no_data() {
        let event = Event::new("event.sync.sync-status", "/cluster/node1");

        assert!(!event.id.is_empty());
        assert_eq!(event.spec_version, SPEC_VERSION);
        assert_eq!(event.data_content_type, APPLICATION_JSON);
        assert!(!event.has_data());
    }

    #[test]
    fn events_get_distinct_ids() {
        let a = Event::new("t", "s");
        let b = Event::new("t", "s");

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn data_as_fails_when_empty() {
        let event = Event::new("t", "s");

        assert!(matches!(
            event.data_as::<serde_json::Value>(),
            Err(EventError::EmptyData)
        ));
    }

    #[test]
    fn data_as_reports_decode_failures() {
        let event = Event::new("t", "s").with_data(&json!({"value": "x"})).unwrap();

        assert!(matches!(event.data_as::<u32>(), Err(EventError::Decode(_))));
    }

    #[test]
    fn serialized_form_uses_cloudevents_attribute_names() {
        let event = Event::new("event.type", "/source")
            .with_data(&json!({"value": 1}))
            .unwrap();

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "event.type");
        assert_eq!(value["specversion"], SPEC_VERSION);
        assert_eq!(value["datacontenttype"], APPLICATION_JSON);
        assert_eq!(value["data"]["value"], 1);
        assert!(value.get("specVersion").is_none());
    }

    #[test]
    fn decodes_a_structured_cloudevent() {
        let event: Event = serde_json::from_value(json!({
            "id": "5ce55d17-9234-4fee-a589-d0f10cb32b8e",
            "type": "event.sync.ptp-status.ptp-state-change",
            "source": "/cluster/node/example.com/ptp/clock_realtime",
            "specversion": "1.0",
            "time": "2021-02-05T17:31:00Z",
            "datacontenttype": "application/json",
            "data": { "version": "v1", "values": [] }
        }))
        .unwrap();

        assert_eq!(event.event_type, "event.sync.ptp-status.ptp-state-change");
        assert_eq!(event.spec_version, "1.0");
        assert_eq!(event.data_content_type, APPLICATION_JSON);
        assert_eq!(event.data.as_ref().unwrap()["version"], "v1");
    }
}
