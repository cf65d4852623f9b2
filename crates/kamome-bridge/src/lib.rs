// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kamome bridge: bidirectional command exchange between a native host and
// the JavaScript running in its WebView.
//
// The host implements `ScriptChannel` for its WebView, forwards messages
// posted under `kamomeSend` to `Client::receive`, and injects the page-side
// library. Everything above that boundary is platform independent.

pub mod client;
pub mod command;
pub mod completion;
pub mod console;
pub mod gate;
pub mod messenger;
pub mod results;
pub mod stub;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

pub use client::{Client, SendCallback, SendOutcome, WeakClient};
pub use command::{Command, CommandRegistry, Handler};
pub use completion::{Completion, LocalCallback, LocalOutcome};
pub use console::{ConsoleLogAdapter, ConsoleLogger, TracingConsoleLogger};
pub use messenger::PeerCall;
pub use results::ResultTable;
pub use traits::{EvalCallback, ScriptChannel};

pub use kamome_core::{BridgeConfig, BridgeError, NonExistentCommandPolicy, Payload};
