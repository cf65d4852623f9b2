// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native commands the demo page can call.

use std::time::Duration;

use serde_json::json;
use tokio::runtime::Handle;
use tracing::info;

use kamome_bridge::{Client, Command};

use crate::state::EventLog;

/// Rejection message of `echoError`; exercises every character the error
/// path has to escape.
pub const ECHO_ERROR_MESSAGE: &str = "Echo Error! ['\"+-._~\\@#$%^&*=,/?;:|{}]";

/// How long `tooLong` takes to resolve, longer than the page's timeout.
pub const TOO_LONG_DELAY: Duration = Duration::from_secs(30);

pub fn register(client: &Client, runtime: Handle, log: EventLog) {
    let echo_log = log.clone();
    let error_log = log.clone();

    client
        .add_command(Command::new("echo", move |name, data, completion| {
            let message = data
                .as_ref()
                .and_then(|d| d.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            info!(command = name, %message, "echo");
            echo_log.native(format!("{name}: {message}"));
            completion.resolve_data(json!({ "message": message }));
        }))
        .add_command(Command::new("echoError", move |name, _, completion| {
            error_log.native(format!("{name}: rejecting"));
            completion.reject(ECHO_ERROR_MESSAGE);
        }))
        .add_command(Command::new("tooLong", move |name, _, completion| {
            log.native(format!("{name}: resolving in {}s", TOO_LONG_DELAY.as_secs()));
            runtime.spawn(async move {
                tokio::time::sleep(TOO_LONG_DELAY).await;
                completion.resolve();
            });
        }));
}
