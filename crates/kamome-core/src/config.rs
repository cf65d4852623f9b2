// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// What the bridge does when the peer invokes a command nobody added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonExistentCommandPolicy {
    /// Resolve with no payload.
    #[default]
    Resolved,
    /// Reject with `"CommandNotAdded"`.
    Rejected,
    /// Treat as a programmer error and panic.
    Exception,
}

/// Tunable bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Policy for inbound calls to unregistered commands.
    pub non_existent_command: NonExistentCommandPolicy,
    /// Delay between readiness retries, in milliseconds (default 200).
    pub ready_retry_delay_ms: u64,
    /// Retries before the readiness gate gives up (default 50, about 10 s).
    pub ready_max_retries: u32,
    /// Global object of the script-side library that receives peer calls.
    pub peer_object: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            non_existent_command: NonExistentCommandPolicy::Resolved,
            ready_retry_delay_ms: 200,
            ready_max_retries: 50,
            peer_object: "window.KM".into(),
        }
    }
}

impl BridgeConfig {
    /// Retry delay as a `Duration`.
    pub fn ready_retry_delay(&self) -> Duration {
        Duration::from_millis(self.ready_retry_delay_ms)
    }

    /// Load a configuration file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject settings the bridge cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.peer_object.trim().is_empty() {
            return Err(BridgeError::Config("peer_object must not be empty".into()));
        }
        if self.ready_retry_delay_ms == 0 {
            return Err(BridgeError::Config(
                "ready_retry_delay_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
