// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The boundary between the bridge and whatever actually hosts the page.
//
// A host (Android WebView, WKWebView, a Dioxus desktop window, a test
// harness) only has to be able to run a script string in the page. Inbound
// traffic goes the other way: the host calls `Client::receive` with the raw
// JSON string the page posted.

use kamome_core::error::{BridgeError, Result};

use crate::messenger::PeerCall;

/// Receives the stringified value a script evaluated to, or `None` when the
/// script threw or the host could not capture a value.
pub type EvalCallback = Box<dyn FnOnce(Option<String>) + Send>;

/// Injects scripts into the embedded page.
///
/// Implementations must run scripts in submission order on the page's own
/// thread and must not call back into the `Client` synchronously from
/// `evaluate`; post to the UI thread instead.
pub trait ScriptChannel: Send + Sync {
    /// Evaluate `script` in the page. Fire-and-forget.
    fn evaluate(&self, script: String);

    /// Evaluate `script` and hand its result to `on_result` once available.
    ///
    /// Hosts without a way to capture results keep the default, which
    /// refuses the call without running the script.
    fn evaluate_with_result(&self, script: String, on_result: EvalCallback) -> Result<()> {
        let _ = (script, on_result);
        Err(BridgeError::Channel(
            "this script channel cannot capture evaluation results".into(),
        ))
    }

    /// Deliver a protocol call to the peer library living at `peer_object`.
    fn deliver(&self, peer_object: &str, call: &PeerCall) {
        self.evaluate(call.to_script(peer_object));
    }
}
