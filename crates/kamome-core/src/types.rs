// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core protocol types for the Kamome bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BridgeError, Result};

/// Structured data exchanged with the script side (object or array of
/// primitives). The bridge never looks inside it except for callback replies.
pub type Payload = serde_json::Value;

/// Version code reported to the script library in the SYN reply.
pub const PROTOCOL_VERSION_CODE: u32 = 50303;

/// Preset command the peer sends once its library has initialised.
pub const COMMAND_SYN: &str = "_kamomeSYN";

/// Preset command the peer sends after it has seen the SYN reply.
pub const COMMAND_ACK: &str = "_kamomeACK";

/// Name under which hosts expose the inbound entry point to the page.
pub const SCRIPT_MESSAGE_HANDLER: &str = "kamomeSend";

/// Rejection message used by the `Rejected` non-existent-command policy.
pub const COMMAND_NOT_ADDED: &str = "CommandNotAdded";

/// Error reported to send callbacks when the peer gave no usable reason.
pub const UNKNOWN_ERROR: &str = "UnknownError";

/// Correlation token for the one-shot command that receives the result of
/// an outbound send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackId(String);

impl CallbackId {
    /// Generate a fresh id of the form `_km_<command>_<uuid>`.
    ///
    /// The command name is only there to make traces readable; uniqueness
    /// comes from the random v4 UUID.
    pub fn generate(command_name: &str) -> Self {
        Self(format!("_km_{command_name}_{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outbound command invocation waiting to be flushed to the peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub name: String,
    pub callback_id: Option<CallbackId>,
    pub data: Option<Payload>,
    pub queued_at: DateTime<Utc>,
}

impl Request {
    pub fn new(name: impl Into<String>, callback_id: Option<CallbackId>, data: Option<Payload>) -> Self {
        Self {
            name: name.into(),
            callback_id,
            data,
            queued_at: Utc::now(),
        }
    }

    /// Milliseconds spent in the queue as of `now`. Never negative.
    pub fn waited_ms(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.queued_at).num_milliseconds()).unwrap_or(0)
    }
}

/// Inbound message from the peer: `{"id": ..., "name": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id echoed back on settlement.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub data: Option<Payload>,
}

impl Envelope {
    /// Parse the raw string handed over by the script channel.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| BridgeError::MalformedEnvelope(e.to_string()))
    }
}

/// Interpret the `{success, result?, error?}` reply the peer sends to a
/// callback command.
///
/// Anything that is not a successful reply becomes an error string; a
/// missing or empty reason is normalised to [`UNKNOWN_ERROR`].
pub fn callback_outcome(data: Option<&Payload>) -> std::result::Result<Option<Payload>, String> {
    let Some(reply) = data.and_then(Payload::as_object) else {
        return Err(UNKNOWN_ERROR.into());
    };

    let success = reply
        .get("success")
        .and_then(Payload::as_bool)
        .unwrap_or(false);

    if success {
        Ok(reply.get("result").filter(|v| !v.is_null()).cloned())
    } else {
        let reason = reply
            .get("error")
            .and_then(Payload::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_ERROR);
        Err(reason.to_string())
    }
}
