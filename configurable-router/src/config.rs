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

use amqp_router::{ConfigError, RouterConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    pub(crate) router: RouterConfig,
    #[serde(default)]
    pub(crate) listeners: Vec<String>,
    #[serde(default)]
    pub(crate) senders: Vec<String>,
    #[serde(default = "default_events_per_sender")]
    pub(crate) events_per_sender: u32,
    #[serde(default)]
    pub(crate) run_for_secs: u64,
}

fn default_events_per_sender() -> u32 {
    1
}

impl DemoConfig {
    pub fn from_json5_str(contents: &str) -> Result<Self, ConfigError> {
        let config: DemoConfig = json5::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json5_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.router.validate()?;

        for (name, addresses) in [("listeners", &self.listeners), ("senders", &self.senders)] {
            let mut seen = HashSet::new();
            for address in addresses {
                if address.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "{name} must not contain empty addresses"
                    )));
                }
                if !seen.insert(address) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate address in {name}: {address}"
                    )));
                }
            }
        }

        Ok(())
    }
}
