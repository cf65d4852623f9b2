// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Script channel for the Dioxus WebView.
//
// Scripts cannot be evaluated from arbitrary threads, so the channel only
// queues them; the page pump running on the UI task hands each one to the
// page in submission order.

use serde::Serialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::warn;

use kamome_bridge::results::ResultTable;
use kamome_bridge::traits::{EvalCallback, ScriptChannel};
use kamome_core::error::{BridgeError, Result};

/// One script on its way to the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundScript {
    pub script: String,
    /// Present when the page must report the script's result back.
    #[serde(rename = "evalId")]
    pub eval_id: Option<u64>,
}

pub struct WebViewChannel {
    tx: UnboundedSender<OutboundScript>,
    results: ResultTable,
}

impl WebViewChannel {
    pub fn new() -> (Self, UnboundedReceiver<OutboundScript>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                tx,
                results: ResultTable::new(),
            },
            rx,
        )
    }

    pub fn results(&self) -> &ResultTable {
        &self.results
    }
}

impl ScriptChannel for WebViewChannel {
    fn evaluate(&self, script: String) {
        let outbound = OutboundScript {
            script,
            eval_id: None,
        };
        if self.tx.send(outbound).is_err() {
            warn!("page pump is gone; dropping script");
        }
    }

    fn evaluate_with_result(&self, script: String, on_result: EvalCallback) -> Result<()> {
        let id = self.results.register(on_result);
        let outbound = OutboundScript {
            script,
            eval_id: Some(id),
        };
        if self.tx.send(outbound).is_err() {
            self.results.complete(id, None);
            return Err(BridgeError::Channel("page pump is gone".into()));
        }
        Ok(())
    }
}
