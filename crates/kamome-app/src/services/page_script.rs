// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Script injected into the Dioxus WebView and the messages it posts back.
//
// The bootstrap defines the two host functions the page talks to
// (`kamomeSend`, `kamomeLog`), overrides the console, loads the peer library
// and then loops forever evaluating scripts the native side sends down.

use serde::Deserialize;

use kamome_bridge::console::{ConsoleLogAdapter, MESSAGE_HANDLER};
use kamome_core::types::SCRIPT_MESSAGE_HANDLER;

const PEER_JS: &str = include_str!("../../assets/peer.js");

/// Receivers the demo page registers with the peer library.
const DEMO_RECEIVERS_JS: &str = r#"
window.KM.addReceiver("greeting", function (data, resolve, reject) {
  console.log("greeting from native: " + JSON.stringify(data));
  resolve({ greeting: "Hello! by JavaScript" });
});
"#;

/// Page-side calls into the native sample commands.
pub const CALL_NATIVE_JS: &str = r#"
window.KM.send("echo", { message: "Hello, Kamome!" })
  .then(function (r) { console.log("echo resolved: " + JSON.stringify(r)); })
  .catch(function (e) { console.error("echo rejected: " + e); });
window.KM.send("echoError", null)
  .then(function (r) { console.log("echoError resolved: " + JSON.stringify(r)); })
  .catch(function (e) { console.warn("echoError rejected: " + e); });
window.KM.send("tooLong", null, 5000)
  .then(function () { console.log("tooLong resolved"); })
  .catch(function (e) { console.warn("tooLong rejected: " + e); });
window.KM.send("notRegistered", null)
  .catch(function (e) { console.warn("notRegistered rejected: " + e); });
"#;

const PUMP_JS: &str = r#"
while (true) {
  const outbound = await dioxus.recv();
  let value = null;
  try {
    value = (0, eval)(outbound.script);
  } catch (e) {
    console.error("script failed: " + e);
  }
  if (outbound.evalId !== null && outbound.evalId !== undefined) {
    dioxus.send({
      kind: "result",
      id: outbound.evalId,
      body: value === undefined || value === null ? null : JSON.stringify(value),
    });
  }
}
"#;

/// Full script for the long-lived page pump eval.
pub fn bootstrap() -> String {
    format!(
        r#"window.{send} = function (body) {{ dioxus.send({{ kind: "message", body: body }}); }};
window.{log} = function (body) {{ dioxus.send({{ kind: "log", body: body }}); }};
{console}
{peer}
{receivers}
{pump}"#,
        send = SCRIPT_MESSAGE_HANDLER,
        log = MESSAGE_HANDLER,
        console = ConsoleLogAdapter::install_script(),
        peer = PEER_JS,
        receivers = DEMO_RECEIVERS_JS,
        pump = PUMP_JS,
    )
}

/// Something the page posted to the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageMessage {
    /// A protocol envelope for `Client::receive`.
    Message { body: String },
    /// A console entry for the console adapter.
    Log { body: String },
    /// Result of an evaluate-with-result call.
    Result { id: u64, body: Option<String> },
}
