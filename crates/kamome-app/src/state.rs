// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application state: the event log shown in the UI.
//
// Bridge callbacks run on whatever thread settles them, so they report
// through an `EventLog` sender and the UI task drains it into a signal.

use chrono::{DateTime, Local};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Lines kept before the oldest are dropped.
const MAX_LINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Native,
    Page,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub source: LogSource,
    pub text: String,
}

/// Cloneable, thread-safe handle for appending to the UI log.
#[derive(Debug, Clone)]
pub struct EventLog {
    tx: UnboundedSender<LogLine>,
}

impl EventLog {
    pub fn channel() -> (Self, UnboundedReceiver<LogLine>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn native(&self, text: impl Into<String>) {
        self.push(LogSource::Native, text.into());
    }

    pub fn page(&self, text: impl Into<String>) {
        self.push(LogSource::Page, text.into());
    }

    fn push(&self, source: LogSource, text: String) {
        // The UI may already be gone during shutdown.
        let _ = self.tx.send(LogLine {
            at: Local::now(),
            source,
            text,
        });
    }
}

/// Shared state accessible to all components via `use_context`.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Whether the page library has completed the handshake.
    pub ready: bool,
    pub lines: Vec<LogLine>,
}

impl AppState {
    pub fn push(&mut self, line: LogLine) {
        self.lines.push(line);
        if self.lines.len() > MAX_LINES {
            let excess = self.lines.len() - MAX_LINES;
            self.lines.drain(..excess);
        }
    }
}
