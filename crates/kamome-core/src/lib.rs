// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kamome core: types, configuration and error definitions shared by the
// bridge and its hosts.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BridgeConfig, NonExistentCommandPolicy};
pub use error::BridgeError;
pub use types::*;
