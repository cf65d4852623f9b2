// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The bridge client: command registry, inbound dispatch, outbound queue and
// the SYN/ACK readiness handshake.
//
// All mutable state sits behind one mutex. Handlers, callbacks and the ready
// listener are always invoked with that mutex released, so they may freely
// call back into the client (send, add, remove) from inside a handler.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use kamome_core::config::{BridgeConfig, NonExistentCommandPolicy};
use kamome_core::error::{BridgeError, Result};
use kamome_core::types::{
    COMMAND_ACK, COMMAND_NOT_ADDED, COMMAND_SYN, CallbackId, Envelope, PROTOCOL_VERSION_CODE,
    Payload, Request, callback_outcome,
};

use crate::command::{Command, CommandRegistry};
use crate::completion::{Completion, LocalCallback};
use crate::gate::{GateDecision, ReadinessGate};
use crate::messenger::PeerCall;
use crate::traits::ScriptChannel;

/// Outcome of an outbound send as reported by the page: the receiver's
/// result, or its rejection reason.
pub type SendOutcome = std::result::Result<Option<Payload>, String>;

/// Receives the page's answer to a `send`, together with the command name
/// that was sent.
pub type SendCallback = Box<dyn FnOnce(&str, SendOutcome) + Send>;

type ReadyListener = Box<dyn FnOnce() + Send>;

struct State {
    commands: CommandRegistry,
    requests: VecDeque<Request>,
    gate: ReadinessGate,
    policy: NonExistentCommandPolicy,
}

struct Inner {
    channel: Arc<dyn ScriptChannel>,
    peer_object: Arc<str>,
    state: Mutex<State>,
    /// Serialises drain-and-deliver so concurrent flushes keep FIFO order.
    flush: Mutex<()>,
    on_ready: Mutex<Option<ReadyListener>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Native end of the bridge. Cheap to clone; clones share one bridge.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

/// Non-owning handle for use inside command handlers, which are stored by
/// the client and must not keep it alive.
#[derive(Clone)]
pub struct WeakClient {
    inner: Weak<Inner>,
}

impl WeakClient {
    pub fn upgrade(&self) -> Option<Client> {
        self.inner.upgrade().map(|inner| Client { inner })
    }
}

impl Client {
    /// Create a client with default settings. Must be called from within a
    /// tokio runtime; readiness retries are scheduled on it.
    pub fn new(channel: Arc<dyn ScriptChannel>) -> Result<Self> {
        Self::with_config(channel, BridgeConfig::default())
    }

    pub fn with_config(channel: Arc<dyn ScriptChannel>, config: BridgeConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        Self::with_runtime(channel, config, runtime)
    }

    /// Create a client that schedules readiness retries on `runtime`.
    pub fn with_runtime(
        channel: Arc<dyn ScriptChannel>,
        config: BridgeConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let mut commands = CommandRegistry::new();
            commands
                .add(syn_command(weak.clone()))
                .add(ack_command(weak.clone()));

            Inner {
                channel,
                peer_object: Arc::from(config.peer_object.as_str()),
                state: Mutex::new(State {
                    commands,
                    requests: VecDeque::new(),
                    gate: ReadinessGate::new(
                        runtime,
                        config.ready_retry_delay(),
                        config.ready_max_retries,
                    ),
                    policy: config.non_existent_command,
                }),
                flush: Mutex::new(()),
                on_ready: Mutex::new(None),
            }
        });

        info!(peer = %inner.peer_object, "bridge client created");
        Ok(Self { inner })
    }

    pub fn downgrade(&self) -> WeakClient {
        WeakClient {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether the page library has sent SYN.
    pub fn is_ready(&self) -> bool {
        lock(&self.inner.state).gate.is_ready()
    }

    /// Requests queued and not yet handed to the script channel.
    pub fn pending_requests(&self) -> usize {
        lock(&self.inner.state).requests.len()
    }

    /// Readiness retries scheduled so far.
    pub fn retry_count(&self) -> u32 {
        lock(&self.inner.state).gate.retry_count()
    }

    /// Whether the readiness wait gave up without a handshake. Queued
    /// requests are kept and still flush if SYN arrives later.
    pub fn is_timed_out(&self) -> bool {
        lock(&self.inner.state).gate.is_timed_out()
    }

    /// How long the oldest queued request has been waiting.
    pub fn oldest_pending_wait_ms(&self) -> Option<u64> {
        let now = Utc::now();
        lock(&self.inner.state)
            .requests
            .front()
            .map(|request| request.waited_ms(now))
    }

    pub fn non_existent_command_policy(&self) -> NonExistentCommandPolicy {
        lock(&self.inner.state).policy
    }

    pub fn set_non_existent_command_policy(&self, policy: NonExistentCommandPolicy) {
        lock(&self.inner.state).policy = policy;
    }

    /// Register `listener` to run once the handshake has completed (after
    /// ACK). Replaces any listener that has not fired yet.
    pub fn set_ready_listener<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *lock(&self.inner.on_ready) = Some(Box::new(listener));
    }

    /// Add (or replace) a command the page can call.
    pub fn add_command(&self, command: Command) -> &Self {
        debug!(command = command.name(), "adding command");
        lock(&self.inner.state).commands.add(command);
        self
    }

    pub fn remove_command(&self, name: &str) {
        lock(&self.inner.state).commands.remove(name);
    }

    pub fn has_command(&self, name: &str) -> bool {
        lock(&self.inner.state).commands.has(name)
    }

    /// Send `name` to the page, optionally expecting an answer.
    ///
    /// Returns once the request is queued. `Err(ReadinessTimedOut)` means the
    /// request stays queued but automatic retry has been abandoned; it goes
    /// out on the next flush after the page becomes ready.
    #[instrument(skip(self, name, data, callback), fields(command = name))]
    pub fn send(
        &self,
        name: &str,
        data: Option<Payload>,
        callback: Option<SendCallback>,
    ) -> Result<()> {
        let callback_id = callback.map(|callback| self.register_callback(name, callback));
        lock(&self.inner.state)
            .requests
            .push_back(Request::new(name, callback_id, data));

        self.inner.wait_for_ready_and_flush()
    }

    /// [`send`](Self::send) with any serializable payload.
    pub fn send_serialized<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
        callback: Option<SendCallback>,
    ) -> Result<()> {
        let data = serde_json::to_value(data)?;
        self.send(name, Some(data), callback)
    }

    /// Run a command registered on this side, in-process, without touching
    /// the script channel.
    ///
    /// # Panics
    ///
    /// When `name` is not registered and the policy is `Exception`.
    pub fn execute(&self, name: &str, data: Option<Payload>, callback: Option<LocalCallback>) {
        let completion = Completion::local(callback);
        if let Err(err) = self.handle(name, data, completion) {
            panic!("{err}");
        }
    }

    /// Entry point for messages posted by the page.
    ///
    /// Malformed messages are logged and dropped; there is nothing to
    /// settle for them.
    ///
    /// # Panics
    ///
    /// When the named command is not registered and the policy is
    /// `Exception`.
    pub fn receive(&self, raw: &str) -> Result<()> {
        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "dropping malformed message from page");
                return Err(err);
            }
        };

        debug!(command = %envelope.name, request_id = %envelope.id, "message from page");
        let completion = Completion::remote(
            self.inner.channel.clone(),
            self.inner.peer_object.clone(),
            envelope.id,
        );
        if let Err(err) = self.handle(&envelope.name, envelope.data, completion) {
            panic!("{err}");
        }
        Ok(())
    }

    /// Look up `name` and run it, or apply the non-existent-command policy.
    /// Only the `Exception` policy produces an error.
    fn handle(&self, name: &str, data: Option<Payload>, completion: Completion) -> Result<()> {
        let (command, policy) = {
            let state = lock(&self.inner.state);
            (state.commands.get(name).cloned(), state.policy)
        };

        match command {
            Some(command) => {
                command.execute(data, completion);
                Ok(())
            }
            None => match policy {
                NonExistentCommandPolicy::Resolved => {
                    debug!(command = name, "command not added; resolving");
                    completion.resolve();
                    Ok(())
                }
                NonExistentCommandPolicy::Rejected => {
                    debug!(command = name, "command not added; rejecting");
                    completion.reject(COMMAND_NOT_ADDED);
                    Ok(())
                }
                NonExistentCommandPolicy::Exception => {
                    Err(BridgeError::CommandNotAdded(name.to_string()))
                }
            },
        }
    }

    /// Register a one-shot command that receives the page's answer to a send
    /// and removes itself after the first delivery.
    fn register_callback(&self, command_name: &str, callback: SendCallback) -> CallbackId {
        let callback_id = CallbackId::generate(command_name);
        let slot = Mutex::new(Some(callback));
        let origin = command_name.to_string();
        let own_id = callback_id.clone();
        let weak = Arc::downgrade(&self.inner);

        let command = Command::new(callback_id.as_str(), move |_, data, completion| {
            let callback = lock(&slot).take();
            if let Some(callback) = callback {
                callback(&origin, callback_outcome(data.as_ref()));
            }

            completion.resolve();

            if let Some(inner) = weak.upgrade() {
                lock(&inner.state).commands.remove(own_id.as_str());
            }
        });

        lock(&self.inner.state).commands.add(command);
        debug!(callback_id = %callback_id, "send callback registered");
        callback_id
    }
}

impl Inner {
    /// Flush queued requests if the page is ready, otherwise defer through
    /// the readiness gate.
    fn wait_for_ready_and_flush(self: &Arc<Self>) -> Result<()> {
        let _flush = lock(&self.flush);
        let mut state = lock(&self.state);

        let weak = Arc::downgrade(self);
        let decision = state.gate.poll(move || {
            if let Some(inner) = weak.upgrade() {
                inner.retry_tick();
            }
        });

        match decision {
            GateDecision::Open => {
                let requests: Vec<Request> = state.requests.drain(..).collect();
                drop(state);

                if !requests.is_empty() {
                    debug!(count = requests.len(), "flushing requests to page");
                }
                let now = Utc::now();
                for request in requests {
                    debug!(
                        command = %request.name,
                        waited_ms = request.waited_ms(now),
                        "delivering request"
                    );
                    self.channel
                        .deliver(&self.peer_object, &PeerCall::from(request));
                }
                Ok(())
            }
            GateDecision::Deferred { .. } | GateDecision::AlreadyScheduled => Ok(()),
            GateDecision::TimedOut { retries } => {
                warn!(
                    retries,
                    queued = state.requests.len(),
                    "waiting for ready has timed out"
                );
                Err(BridgeError::ReadinessTimedOut { retries })
            }
        }
    }

    fn retry_tick(self: &Arc<Self>) {
        lock(&self.state).gate.retry_fired();
        // Timeouts are already logged on the flush path.
        let _ = self.wait_for_ready_and_flush();
    }

    fn mark_ready(&self) {
        lock(&self.state).gate.mark_ready();
        info!("page library is ready");
    }

    fn notify_ready(self: &Arc<Self>) {
        let listener = lock(&self.on_ready).take();
        if let Some(listener) = listener {
            listener();
        }
        if let Err(err) = self.wait_for_ready_and_flush() {
            debug!(error = %err, "flush after handshake failed");
        }
    }
}

fn syn_command(weak: Weak<Inner>) -> Command {
    Command::new(COMMAND_SYN, move |_, _, completion| {
        if let Some(inner) = weak.upgrade() {
            inner.mark_ready();
        }
        completion.resolve_data(json!({ "versionCode": PROTOCOL_VERSION_CODE }));
    })
}

fn ack_command(weak: Weak<Inner>) -> Command {
    Command::new(COMMAND_ACK, move |_, _, completion| {
        completion.resolve();
        if let Some(inner) = weak.upgrade() {
            inner.notify_ready();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::LocalOutcome;
    use crate::stub::RecordingChannel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn client() -> (Client, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::new());
        let client = Client::new(channel.clone()).expect("client");
        (client, channel)
    }

    fn handshake(client: &Client) {
        client
            .receive(r#"{"id":"syn","name":"_kamomeSYN","data":null}"#)
            .expect("syn");
        client
            .receive(r#"{"id":"ack","name":"_kamomeACK","data":null}"#)
            .expect("ack");
    }

    fn receive_names(channel: &RecordingChannel) -> Vec<String> {
        channel
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                PeerCall::Receive { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    fn echo_command() -> Command {
        Command::new("echo", |_, data, completion| {
            let message = data
                .as_ref()
                .and_then(|d| d.get("message"))
                .cloned()
                .unwrap_or(Payload::Null);
            completion.resolve_data(json!({ "message": message }));
        })
    }

    #[tokio::test]
    async fn echo_round_trip() {
        let (client, channel) = client();
        client.add_command(echo_command());

        client
            .receive(r#"{"id":"r1","name":"echo","data":{"message":"hi"}}"#)
            .expect("receive");

        assert_eq!(
            channel.scripts(),
            vec![r#"window.KM.onComplete({"message":"hi"}, "r1")"#.to_string()]
        );
    }

    #[tokio::test]
    async fn malformed_message_is_dropped() {
        let (client, channel) = client();
        assert!(matches!(
            client.receive("{not json"),
            Err(BridgeError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            client.receive(r#"{"name":"echo"}"#),
            Err(BridgeError::MalformedEnvelope(_))
        ));
        assert!(channel.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_command_resolves_by_default() {
        let (client, channel) = client();
        client
            .receive(r#"{"id":"q","name":"x","data":null}"#)
            .expect("receive");

        assert_eq!(
            channel.calls(),
            vec![PeerCall::Complete {
                data: None,
                request_id: "q".into()
            }]
        );
    }

    #[tokio::test]
    async fn missing_command_rejects_with_policy() {
        let (client, channel) = client();
        client.set_non_existent_command_policy(NonExistentCommandPolicy::Rejected);
        client
            .receive(r#"{"id":"q","name":"x","data":null}"#)
            .expect("receive");

        assert_eq!(
            channel.calls(),
            vec![PeerCall::Error {
                message: Some(COMMAND_NOT_ADDED.into()),
                request_id: "q".into()
            }]
        );
    }

    #[tokio::test]
    #[should_panic(expected = "x command not added.")]
    async fn missing_command_panics_with_exception_policy() {
        let (client, _channel) = client();
        client.set_non_existent_command_policy(NonExistentCommandPolicy::Exception);
        let _ = client.receive(r#"{"id":"q","name":"x","data":null}"#);
    }

    #[tokio::test]
    #[should_panic(expected = "nothing command not added.")]
    async fn execute_missing_command_panics_with_exception_policy() {
        let (client, _channel) = client();
        client.set_non_existent_command_policy(NonExistentCommandPolicy::Exception);
        client.execute("nothing", None, None);
    }

    #[tokio::test]
    async fn execute_runs_locally() {
        let (client, channel) = client();
        client.add_command(echo_command());

        let (tx, rx) = std::sync::mpsc::channel::<LocalOutcome>();
        client.execute(
            "echo",
            Some(json!({"message": "local"})),
            Some(Box::new(move |outcome| {
                let _ = tx.send(outcome);
            })),
        );

        assert_eq!(
            rx.recv().expect("outcome"),
            Ok(Some(json!({"message": "local"})))
        );
        assert!(channel.calls().is_empty());
    }

    #[tokio::test]
    async fn execute_missing_command_follows_policy() {
        let (client, _channel) = client();
        client.set_non_existent_command_policy(NonExistentCommandPolicy::Rejected);

        let (tx, rx) = std::sync::mpsc::channel::<LocalOutcome>();
        client.execute(
            "nothing",
            None,
            Some(Box::new(move |outcome| {
                let _ = tx.send(outcome);
            })),
        );
        assert_eq!(rx.recv().expect("outcome"), Err(COMMAND_NOT_ADDED.to_string()));
    }

    #[tokio::test]
    async fn syn_marks_ready_and_reports_version() {
        let (client, channel) = client();
        assert!(!client.is_ready());

        client
            .receive(r#"{"id":"s1","name":"_kamomeSYN","data":null}"#)
            .expect("syn");

        assert!(client.is_ready());
        assert_eq!(
            channel.calls(),
            vec![PeerCall::Complete {
                data: Some(json!({"versionCode": PROTOCOL_VERSION_CODE})),
                request_id: "s1".into()
            }]
        );
    }

    #[tokio::test]
    async fn ack_fires_ready_listener_once() {
        let (client, channel) = client();
        let fired = Arc::new(AtomicUsize::new(0));
        let hits = fired.clone();
        client.set_ready_listener(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        handshake(&client);
        client
            .receive(r#"{"id":"ack2","name":"_kamomeACK","data":null}"#)
            .expect("second ack");

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(channel.calls().contains(&PeerCall::Complete {
            data: None,
            request_id: "ack".into()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn requests_wait_for_handshake_in_fifo_order() {
        let (client, channel) = client();
        for name in ["r1", "r2", "r3"] {
            client.send(name, None, None).expect("send");
        }
        assert_eq!(client.pending_requests(), 3);
        assert!(receive_names(&channel).is_empty());

        handshake(&client);

        assert_eq!(receive_names(&channel), vec!["r1", "r2", "r3"]);
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_request_goes_out_after_ack() {
        let (client, channel) = client();
        client
            .send("greet", None, Some(Box::new(|_, _| {})))
            .expect("send");

        client
            .receive(r#"{"id":"syn","name":"_kamomeSYN","data":null}"#)
            .expect("syn");
        assert!(receive_names(&channel).is_empty());

        client
            .receive(r#"{"id":"ack","name":"_kamomeACK","data":null}"#)
            .expect("ack");
        assert_eq!(receive_names(&channel), vec!["greet"]);

        // The ACK settlement precedes the flushed request.
        let calls = channel.calls();
        let ack_at = calls
            .iter()
            .position(|c| matches!(c, PeerCall::Complete { request_id, .. } if request_id == "ack"))
            .expect("ack settled");
        let greet_at = calls
            .iter()
            .position(|c| matches!(c, PeerCall::Receive { .. }))
            .expect("greet sent");
        assert!(ack_at < greet_at);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_tick_flushes_after_syn() {
        let (client, channel) = client();
        client.send("later", None, None).expect("send");
        client
            .receive(r#"{"id":"syn","name":"_kamomeSYN","data":null}"#)
            .expect("syn");

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(receive_names(&channel), vec!["later"]);
    }

    #[tokio::test]
    async fn send_after_ready_flushes_immediately() {
        let (client, channel) = client();
        handshake(&client);

        client
            .send("now", Some(json!({"a": 1})), None)
            .expect("send");
        assert_eq!(
            channel.calls().last(),
            Some(&PeerCall::Receive {
                name: "now".into(),
                data: Some(json!({"a": 1})),
                callback_id: None
            })
        );
        assert_eq!(client.retry_count(), 0);
    }

    #[tokio::test]
    async fn send_serialized_encodes_payload() {
        #[derive(Serialize)]
        struct Greeting<'a> {
            greeting: &'a str,
        }

        let (client, channel) = client();
        handshake(&client);
        client
            .send_serialized("greeting", &Greeting { greeting: "Hi!" }, None)
            .expect("send");

        assert!(matches!(
            channel.calls().last(),
            Some(PeerCall::Receive { data: Some(d), .. }) if d == &json!({"greeting": "Hi!"})
        ));
    }

    fn sent_callback_id(channel: &RecordingChannel) -> CallbackId {
        channel
            .calls()
            .into_iter()
            .find_map(|call| match call {
                PeerCall::Receive { callback_id, .. } => callback_id,
                _ => None,
            })
            .expect("callback id")
    }

    #[tokio::test]
    async fn send_callback_is_one_shot() {
        let (client, channel) = client();
        handshake(&client);

        let (tx, rx) = std::sync::mpsc::channel::<(String, SendOutcome)>();
        client
            .send(
                "greeting",
                None,
                Some(Box::new(move |name, outcome| {
                    let _ = tx.send((name.to_string(), outcome));
                })),
            )
            .expect("send");

        let id = sent_callback_id(&channel);
        assert!(id.as_str().starts_with("_km_greeting_"));
        assert!(client.has_command(id.as_str()));

        let reply = format!(
            r#"{{"id":"c1","name":"{id}","data":{{"success":true,"result":{{"ok":true}}}}}}"#
        );
        client.receive(&reply).expect("reply");

        assert_eq!(
            rx.recv().expect("callback"),
            ("greeting".to_string(), Ok(Some(json!({"ok": true}))))
        );
        assert!(!client.has_command(id.as_str()));
        assert!(channel.calls().contains(&PeerCall::Complete {
            data: None,
            request_id: "c1".into()
        }));

        // A second delivery finds no callback and falls to the policy.
        client.receive(&reply.replace("c1", "c2")).expect("replay");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_callback_failure_normalises_reason() {
        let (client, channel) = client();
        handshake(&client);

        let (tx, rx) = std::sync::mpsc::channel::<SendOutcome>();
        client
            .send(
                "greeting",
                None,
                Some(Box::new(move |_, outcome| {
                    let _ = tx.send(outcome);
                })),
            )
            .expect("send");

        let id = sent_callback_id(&channel);
        client
            .receive(&format!(
                r#"{{"id":"c1","name":"{id}","data":{{"success":false,"error":null}}}}"#
            ))
            .expect("reply");
        assert_eq!(rx.recv().expect("callback"), Err("UnknownError".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_retries_are_bounded() {
        let (client, _channel) = client();
        client.send("never", None, None).expect("first send");
        assert_eq!(client.retry_count(), 1);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(client.retry_count(), 6);

        assert!(!client.is_timed_out());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.retry_count(), 50);
        assert!(client.is_timed_out());

        assert!(matches!(
            client.send("still-never", None, None),
            Err(BridgeError::ReadinessTimedOut { retries: 50 })
        ));
        assert_eq!(client.pending_requests(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_requests_survive_timeout_and_flush_after_late_handshake() {
        let (client, channel) = client();
        client.send("early", None, None).expect("send");
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.retry_count(), 50);

        assert!(client.is_timed_out());
        assert!(client.oldest_pending_wait_ms().is_some());

        handshake(&client);
        assert_eq!(receive_names(&channel), vec!["early"]);
        assert!(!client.is_timed_out());
        assert_eq!(client.oldest_pending_wait_ms(), None);
    }

    #[tokio::test]
    async fn handler_may_reenter_client() {
        let (client, channel) = client();
        handshake(&client);

        let weak = client.downgrade();
        client.add_command(Command::new("relay", move |_, data, completion| {
            if let Some(client) = weak.upgrade() {
                let _ = client.send("relayed", data, None);
                client.remove_command("relay");
            }
            completion.resolve();
        }));

        client
            .receive(r#"{"id":"r","name":"relay","data":{"v":1}}"#)
            .expect("receive");

        assert_eq!(receive_names(&channel), vec!["relayed"]);
        assert!(!client.has_command("relay"));
    }

    #[tokio::test]
    async fn placeholder_command_does_not_settle() {
        let (client, channel) = client();
        client.add_command(Command::placeholder("noop"));
        client
            .receive(r#"{"id":"n","name":"noop","data":null}"#)
            .expect("receive");
        assert!(channel.calls().is_empty());
    }

    #[test]
    fn new_outside_runtime_fails() {
        let channel = Arc::new(RecordingChannel::new());
        assert!(matches!(Client::new(channel), Err(BridgeError::NoRuntime)));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let channel = Arc::new(RecordingChannel::new());
        let config = BridgeConfig {
            peer_object: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            Client::with_config(channel, config),
            Err(BridgeError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_client_cancels_retry() {
        let channel = Arc::new(RecordingChannel::new());
        let client = Client::new(channel.clone()).expect("client");
        client.send("orphan", None, None).expect("send");
        let weak = client.downgrade();
        drop(client);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(weak.upgrade().is_none());
        assert!(channel.calls().is_empty());
    }
}
