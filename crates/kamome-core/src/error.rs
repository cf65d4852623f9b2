// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Kamome.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Inbound traffic --
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("{0} command not added.")]
    CommandNotAdded(String),

    // -- Outbound traffic --
    #[error("waiting for ready has timed out after {retries} retries")]
    ReadinessTimedOut { retries: u32 },

    #[error("no tokio runtime available to schedule readiness retries")]
    NoRuntime,

    #[error("script channel error: {0}")]
    Channel(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
