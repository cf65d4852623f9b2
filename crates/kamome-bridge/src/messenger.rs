// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendering of native -> page protocol calls into JavaScript.
//
// Three entry points exist on the script-side library object:
//
//   onReceive(name, data | null, callbackId | null)   invoke a page receiver
//   onComplete(data | null, requestId)                 settle a page request
//   onError(message | null, requestId)                 fail a page request
//
// Every string argument is emitted as a JSON string literal so quotes and
// backslashes cannot break argument boundaries. Error messages are also
// percent-encoded because the page runs them through `decodeURIComponent`.

use kamome_core::types::{CallbackId, Payload, Request};

/// One call into the script-side library.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerCall {
    /// Invoke the page receiver registered for `name`.
    Receive {
        name: String,
        data: Option<Payload>,
        callback_id: Option<CallbackId>,
    },
    /// Resolve the page request `request_id`.
    Complete {
        data: Option<Payload>,
        request_id: String,
    },
    /// Reject the page request `request_id`.
    Error {
        message: Option<String>,
        request_id: String,
    },
}

impl From<Request> for PeerCall {
    fn from(request: Request) -> Self {
        PeerCall::Receive {
            name: request.name,
            data: request.data,
            callback_id: request.callback_id,
        }
    }
}

impl PeerCall {
    /// The JavaScript statement that performs this call on `peer_object`.
    pub fn to_script(&self, peer_object: &str) -> String {
        match self {
            PeerCall::Receive {
                name,
                data,
                callback_id,
            } => format!(
                "{peer_object}.onReceive({}, {}, {})",
                string_literal(name),
                payload_literal(data.as_ref()),
                callback_id
                    .as_ref()
                    .map_or_else(|| "null".to_string(), |id| string_literal(id.as_str())),
            ),
            PeerCall::Complete { data, request_id } => format!(
                "{peer_object}.onComplete({}, {})",
                payload_literal(data.as_ref()),
                string_literal(request_id),
            ),
            PeerCall::Error {
                message,
                request_id,
            } => format!(
                "{peer_object}.onError({}, {})",
                message.as_deref().map_or_else(
                    || "null".to_string(),
                    |m| string_literal(&encode_uri_component(m))
                ),
                string_literal(request_id),
            ),
        }
    }
}

/// Percent-encode `input` exactly like JavaScript's `encodeURIComponent`.
pub fn encode_uri_component(input: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => {
                out.push('%');
                out.push(HEX[(byte >> 4) as usize] as char);
                out.push(HEX[(byte & 0x0F) as usize] as char);
            }
        }
    }
    out
}

fn string_literal(s: &str) -> String {
    js_safe(Payload::String(s.to_owned()).to_string())
}

fn payload_literal(data: Option<&Payload>) -> String {
    match data {
        Some(value) if !value.is_null() => js_safe(value.to_string()),
        _ => "null".to_string(),
    }
}

/// JSON allows raw U+2028/U+2029 inside strings; older script engines treat
/// them as line terminators.
fn js_safe(json: String) -> String {
    if json.contains(['\u{2028}', '\u{2029}']) {
        json.replace('\u{2028}', "\\u2028")
            .replace('\u{2029}', "\\u2029")
    } else {
        json
    }
}
