// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Console log adapter: page-side `console.*` output routed to the host.
//
// The host injects `install_script()` at document start and exposes a
// function named `MESSAGE_HANDLER` that forwards its single string argument
// to `ConsoleLogAdapter::handle`.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, warn};

use kamome_core::error::{BridgeError, Result};

/// Name of the host function the injected script posts console entries to.
pub const MESSAGE_HANDLER: &str = "kamomeLog";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
    Assert,
}

/// One console call captured on the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    #[serde(default)]
    pub message: String,
}

/// Receives console entries from the page.
pub trait ConsoleLogger: Send + Sync {
    fn console_log(&self, entry: &ConsoleEntry);
}

/// Re-emits page console output as tracing events under `kamome::console`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsoleLogger;

impl ConsoleLogger for TracingConsoleLogger {
    fn console_log(&self, entry: &ConsoleEntry) {
        match entry.level {
            ConsoleLevel::Log => info!(target: "kamome::console", "{}", entry.message),
            ConsoleLevel::Warn => warn!(target: "kamome::console", "{}", entry.message),
            ConsoleLevel::Error | ConsoleLevel::Assert => {
                error!(target: "kamome::console", level = ?entry.level, "{}", entry.message)
            }
        }
    }
}

pub struct ConsoleLogAdapter {
    logger: Arc<dyn ConsoleLogger>,
}

impl Default for ConsoleLogAdapter {
    fn default() -> Self {
        Self::new(Arc::new(TracingConsoleLogger))
    }
}

impl ConsoleLogAdapter {
    pub fn new(logger: Arc<dyn ConsoleLogger>) -> Self {
        Self { logger }
    }

    /// Script overriding `console.log/warn/error/assert` so each call is
    /// posted to [`MESSAGE_HANDLER`] as `{"level": ..., "message": ...}`.
    pub fn install_script() -> String {
        format!(
            r#"(function () {{
  var post = function (level, args) {{
    var message = Array.prototype.map.call(args, function (a) {{
      if (typeof a === "string") return a;
      try {{ return JSON.stringify(a); }} catch (e) {{ return String(a); }}
    }}).join(" ");
    window.{handler}(JSON.stringify({{ level: level, message: message }}));
  }};
  window.console.log = function () {{ post("log", arguments); }};
  window.console.warn = function () {{ post("warn", arguments); }};
  window.console.error = function () {{ post("error", arguments); }};
  window.console.assert = function (cond) {{
    if (!cond) post("assert", Array.prototype.slice.call(arguments, 1));
  }};
}})();"#,
            handler = MESSAGE_HANDLER
        )
    }

    /// Parse one posted entry and hand it to the logger.
    pub fn handle(&self, raw: &str) -> Result<()> {
        let entry: ConsoleEntry = serde_json::from_str(raw)
            .map_err(|e| BridgeError::MalformedEnvelope(format!("console entry: {e}")))?;
        self.logger.console_log(&entry);
        Ok(())
    }
}
