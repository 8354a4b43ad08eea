/********************************************************************************
 * Copyright (c) 2025 Contributors to the Eclipse Foundation
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

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LINK_CREDIT: u32 = 50;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_BROADCAST_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_RESULT_QUEUE_SIZE: usize = 1_024;
pub const DEFAULT_COMMAND_ACK_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CREATE_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Connection parameters consumed by the router.
///
/// ```
/// use amqp_router::RouterConfig;
/// use std::time::Duration;
///
/// let config = RouterConfig::from_json5_str(r#"{ host: "amqp://localhost:5672" }"#).unwrap();
/// assert_eq!(config.link_credit, 50);
/// assert_eq!(config.send_timeout(), Duration::from_secs(2));
/// assert_eq!(config.broadcast_timeout(), Duration::from_secs(1));
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    pub host: String,
    #[serde(default = "default_link_credit")]
    pub link_credit: u32,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_broadcast_timeout_ms")]
    pub broadcast_timeout_ms: u64,
    #[serde(default = "default_result_queue_size")]
    pub result_queue_size: usize,
    #[serde(default = "default_command_ack_timeout_ms")]
    pub command_ack_timeout_ms: u64,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Bound on session plus link negotiation for one endpoint. Keep it below
    /// `command_ack_timeout_ms` so strict submitters see the creation error.
    #[serde(default = "default_create_timeout_ms")]
    pub create_timeout_ms: u64,
    /// Bound on each link or session close.
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
}

fn default_link_credit() -> u32 {
    DEFAULT_LINK_CREDIT
}

fn default_send_timeout_ms() -> u64 {
    DEFAULT_SEND_TIMEOUT_MS
}

fn default_broadcast_timeout_ms() -> u64 {
    DEFAULT_BROADCAST_TIMEOUT_MS
}

fn default_result_queue_size() -> usize {
    DEFAULT_RESULT_QUEUE_SIZE
}

fn default_command_ack_timeout_ms() -> u64 {
    DEFAULT_COMMAND_ACK_TIMEOUT_MS
}

fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

fn default_create_timeout_ms() -> u64 {
    DEFAULT_CREATE_TIMEOUT_MS
}

fn default_close_timeout_ms() -> u64 {
    DEFAULT_CLOSE_TIMEOUT_MS
}

impl RouterConfig {
    /// Creates a config for `host` with every other field at its default.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            link_credit: DEFAULT_LINK_CREDIT,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            broadcast_timeout_ms: DEFAULT_BROADCAST_TIMEOUT_MS,
            result_queue_size: DEFAULT_RESULT_QUEUE_SIZE,
            command_ack_timeout_ms: DEFAULT_COMMAND_ACK_TIMEOUT_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            create_timeout_ms: DEFAULT_CREATE_TIMEOUT_MS,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
        }
    }

    pub fn from_json5_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = json5::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json5_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.link_credit == 0 {
            return Err(ConfigError::Invalid(
                "link_credit must be greater than zero".to_string(),
            ));
        }
        if self.result_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "result_queue_size must be greater than zero".to_string(),
            ));
        }

        for (name, value) in [
            ("send_timeout_ms", self.send_timeout_ms),
            ("broadcast_timeout_ms", self.broadcast_timeout_ms),
            ("command_ack_timeout_ms", self.command_ack_timeout_ms),
            ("shutdown_timeout_ms", self.shutdown_timeout_ms),
            ("create_timeout_ms", self.create_timeout_ms),
            ("close_timeout_ms", self.close_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_millis(self.broadcast_timeout_ms)
    }

    pub fn command_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.command_ack_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}
