// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Readiness gate: holds outbound traffic back until the page library has
// announced itself, retrying on a fixed delay with a bounded budget.
//
// NOT_READY -> READY is one-way and driven from outside (the SYN command).
// While not ready, each flush attempt schedules one retry on the tokio
// runtime; at most one retry is outstanding at a time. Once the budget is
// spent the gate reports a timeout and stops scheduling.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// What the caller of the flush path should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Ready: flush now.
    Open,
    /// Not ready: retry number `retry` has been scheduled.
    Deferred { retry: u32 },
    /// Not ready and a retry is already pending; nothing new scheduled.
    AlreadyScheduled,
    /// Not ready and the retry budget is spent.
    TimedOut { retries: u32 },
}

pub struct ReadinessGate {
    ready: bool,
    retry_count: u32,
    max_retries: u32,
    delay: Duration,
    runtime: Handle,
    pending: Option<JoinHandle<()>>,
}

impl ReadinessGate {
    pub fn new(runtime: Handle, delay: Duration, max_retries: u32) -> Self {
        Self {
            ready: false,
            retry_count: 0,
            max_retries,
            delay,
            runtime,
            pending: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Retries scheduled so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_timed_out(&self) -> bool {
        !self.ready && self.retry_count >= self.max_retries && self.pending.is_none()
    }

    /// Flip to READY. Idempotent; never reverts.
    pub fn mark_ready(&mut self) {
        if !self.ready {
            debug!(retries = self.retry_count, "readiness gate opened");
        }
        self.ready = true;
    }

    /// Decide whether outbound traffic may flow, scheduling `retry` after
    /// the configured delay when it may not.
    pub fn poll<F>(&mut self, retry: F) -> GateDecision
    where
        F: FnOnce() + Send + 'static,
    {
        if self.ready {
            return GateDecision::Open;
        }

        if self.pending.as_ref().is_some_and(|h| !h.is_finished()) {
            return GateDecision::AlreadyScheduled;
        }

        if self.retry_count >= self.max_retries {
            self.pending = None;
            return GateDecision::TimedOut {
                retries: self.retry_count,
            };
        }

        self.retry_count += 1;
        let delay = self.delay;
        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            retry();
        }));

        debug!(retry = self.retry_count, delay_ms = delay.as_millis() as u64, "waiting for ready");
        GateDecision::Deferred {
            retry: self.retry_count,
        }
    }

    /// Called by the retry task itself before it re-enters the flush path,
    /// so that path does not see its own task as an outstanding retry.
    pub fn retry_fired(&mut self) {
        self.pending = None;
    }

    /// Abort any outstanding retry.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for ReadinessGate {
    fn drop(&mut self) {
        self.cancel();
    }
}
