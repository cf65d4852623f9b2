// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-fire settlement of one command invocation.
//
// A `Completion` is handed to exactly one handler call. Whatever the handler
// does with it (resolve twice, reject after resolve, settle from another
// thread) only the first settlement reaches its destination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::trace;

use kamome_core::types::Payload;

use crate::messenger::PeerCall;
use crate::traits::ScriptChannel;

/// Message reported to local callbacks when a handler rejects without one.
pub const LOCAL_REJECTED: &str = "Rejected";

/// Rejection message used when a resolve payload cannot be encoded.
pub const ENCODE_FAILED: &str = "Failed to encode payload.";

/// Outcome delivered to a local caller: the resolved payload or the
/// rejection message.
pub type LocalOutcome = std::result::Result<Option<Payload>, String>;

/// In-process receiver for a `Client::execute` call.
pub type LocalCallback = Box<dyn FnOnce(LocalOutcome) + Send>;

enum Target {
    /// Settles a request the page made, addressed by its id.
    Remote {
        channel: Arc<dyn ScriptChannel>,
        peer_object: Arc<str>,
        request_id: String,
    },
    /// Settles an in-process `execute` call.
    Local {
        callback: Mutex<Option<LocalCallback>>,
    },
}

pub struct Completion {
    completed: AtomicBool,
    target: Target,
}

impl Completion {
    pub(crate) fn remote(
        channel: Arc<dyn ScriptChannel>,
        peer_object: Arc<str>,
        request_id: String,
    ) -> Self {
        Self {
            completed: AtomicBool::new(false),
            target: Target::Remote {
                channel,
                peer_object,
                request_id,
            },
        }
    }

    /// A completion that reports to `callback` in-process.
    pub fn local(callback: Option<LocalCallback>) -> Self {
        Self {
            completed: AtomicBool::new(false),
            target: Target::Local {
                callback: Mutex::new(callback),
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Correlation id of the page request, for remote completions.
    pub fn request_id(&self) -> Option<&str> {
        match &self.target {
            Target::Remote { request_id, .. } => Some(request_id),
            Target::Local { .. } => None,
        }
    }

    /// Resolve without a payload.
    pub fn resolve(&self) {
        self.settle(Ok(None));
    }

    /// Resolve with `data`.
    pub fn resolve_data(&self, data: Payload) {
        let data = if data.is_null() { None } else { Some(data) };
        self.settle(Ok(data));
    }

    /// Resolve with any serializable value. A value that cannot be encoded
    /// rejects with [`ENCODE_FAILED`] instead.
    pub fn resolve_with<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_value(value) {
            Ok(data) => self.resolve_data(data),
            Err(e) => {
                tracing::debug!(error = %e, "resolve payload could not be encoded");
                self.reject(ENCODE_FAILED);
            }
        }
    }

    /// Reject with `message`. An empty message counts as no message.
    pub fn reject(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let message = (!message.is_empty()).then(|| message.to_string());
        self.settle(Err(message));
    }

    /// Reject without giving a reason.
    pub fn reject_without_message(&self) {
        self.settle(Err(None));
    }

    fn settle(&self, outcome: std::result::Result<Option<Payload>, Option<String>>) {
        if self.completed.swap(true, Ordering::AcqRel) {
            trace!(request_id = ?self.request_id(), "completion already settled; ignoring");
            return;
        }

        match &self.target {
            Target::Remote {
                channel,
                peer_object,
                request_id,
            } => {
                let call = match outcome {
                    Ok(data) => PeerCall::Complete {
                        data,
                        request_id: request_id.clone(),
                    },
                    Err(message) => PeerCall::Error {
                        message,
                        request_id: request_id.clone(),
                    },
                };
                channel.deliver(peer_object, &call);
            }
            Target::Local { callback } => {
                let callback = callback
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(callback) = callback {
                    callback(outcome.map_err(|m| m.unwrap_or_else(|| LOCAL_REJECTED.into())));
                }
            }
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("request_id", &self.request_id())
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::RecordingChannel;
    use serde_json::json;

    fn recording_local() -> (Completion, Arc<Mutex<Vec<LocalOutcome>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let completion = Completion::local(Some(Box::new(move |outcome| {
            sink.lock().expect("lock").push(outcome);
        })));
        (completion, seen)
    }

    #[test]
    fn first_settlement_wins_locally() {
        let (completion, seen) = recording_local();
        completion.resolve_data(json!({"n": 1}));
        completion.reject("late");
        completion.resolve();

        assert!(completion.is_completed());
        assert_eq!(*seen.lock().expect("lock"), vec![Ok(Some(json!({"n": 1})))]);
    }

    #[test]
    fn reject_then_resolve_keeps_rejection() {
        let (completion, seen) = recording_local();
        completion.reject("first");
        completion.resolve_data(json!([1]));

        assert_eq!(*seen.lock().expect("lock"), vec![Err("first".to_string())]);
    }

    #[test]
    fn local_reject_without_message_uses_placeholder() {
        let (completion, seen) = recording_local();
        completion.reject("");
        assert_eq!(*seen.lock().expect("lock"), vec![Err(LOCAL_REJECTED.to_string())]);

        let (completion, seen) = recording_local();
        completion.reject_without_message();
        assert_eq!(*seen.lock().expect("lock"), vec![Err(LOCAL_REJECTED.to_string())]);
    }

    #[test]
    fn local_without_callback_still_settles() {
        let completion = Completion::local(None);
        completion.resolve();
        assert!(completion.is_completed());
    }

    #[test]
    fn remote_settles_once_across_channel() {
        let channel = Arc::new(RecordingChannel::new());
        let completion = Completion::remote(channel.clone(), "window.KM".into(), "r1".into());
        completion.reject("boom");
        completion.reject("again");
        completion.resolve();

        assert_eq!(
            channel.calls(),
            vec![PeerCall::Error {
                message: Some("boom".into()),
                request_id: "r1".into(),
            }]
        );
        assert_eq!(completion.request_id(), Some("r1"));
    }

    #[test]
    fn remote_empty_rejection_is_null() {
        let channel = Arc::new(RecordingChannel::new());
        let completion = Completion::remote(channel.clone(), "window.KM".into(), "r2".into());
        completion.reject("");

        assert_eq!(
            channel.scripts(),
            vec![r#"window.KM.onError(null, "r2")"#.to_string()]
        );
    }

    #[test]
    fn resolve_null_payload_is_no_payload() {
        let (completion, seen) = recording_local();
        completion.resolve_data(Payload::Null);
        assert_eq!(*seen.lock().expect("lock"), vec![Ok(None)]);
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("nope"))
        }
    }

    #[test]
    fn unencodable_payload_rejects_instead() {
        let (completion, seen) = recording_local();
        completion.resolve_with(&Unencodable);
        assert_eq!(*seen.lock().expect("lock"), vec![Err(ENCODE_FAILED.to_string())]);
    }

    #[test]
    fn resolve_with_struct() {
        #[derive(Serialize)]
        struct Reply {
            message: &'static str,
        }

        let (completion, seen) = recording_local();
        completion.resolve_with(&Reply { message: "hi" });
        assert_eq!(*seen.lock().expect("lock"), vec![Ok(Some(json!({"message": "hi"})))]);
    }

    #[test]
    fn concurrent_settlement_delivers_once() {
        let channel = Arc::new(RecordingChannel::new());
        let completion = Arc::new(Completion::remote(
            channel.clone(),
            "window.KM".into(),
            "r3".into(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let completion = completion.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        completion.resolve();
                    } else {
                        completion.reject("racing");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }

        assert_eq!(channel.calls().len(), 1);
    }
}
