// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording script channel for desktop/CI builds where no page is attached.
//
// Nothing is executed: every script and protocol call is kept in order so
// tests and headless hosts can inspect what the bridge would have sent.

use std::sync::{Mutex, PoisonError};

use kamome_core::error::Result;

use crate::messenger::PeerCall;
use crate::results::ResultTable;
use crate::traits::{EvalCallback, ScriptChannel};

/// Script channel that records instead of executing.
#[derive(Default)]
pub struct RecordingChannel {
    scripts: Mutex<Vec<String>>,
    calls: Mutex<Vec<PeerCall>>,
    results: ResultTable,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every script passed to the channel, in submission order.
    pub fn scripts(&self) -> Vec<String> {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Protocol calls delivered through [`ScriptChannel::deliver`], in order.
    pub fn calls(&self) -> Vec<PeerCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Evaluations still waiting for a result; answer them with
    /// `results().complete(id, value)`.
    pub fn results(&self) -> &ResultTable {
        &self.results
    }
}

impl ScriptChannel for RecordingChannel {
    fn evaluate(&self, script: String) {
        tracing::trace!(%script, "recording script");
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(script);
    }

    fn evaluate_with_result(&self, script: String, on_result: EvalCallback) -> Result<()> {
        self.results.register(on_result);
        self.evaluate(script);
        Ok(())
    }

    fn deliver(&self, peer_object: &str, call: &PeerCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());
        self.evaluate(call.to_script(peer_object));
    }
}
