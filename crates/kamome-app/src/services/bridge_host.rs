// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge host: owns the client, the WebView channel and the console adapter,
// and runs the page pump that connects them to the Dioxus document.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use dioxus::document;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use kamome_bridge::console::{ConsoleEntry, ConsoleLevel, ConsoleLogger, TracingConsoleLogger};
use kamome_bridge::{Client, ConsoleLogAdapter, ScriptChannel, SendCallback};
use kamome_core::config::{BridgeConfig, NonExistentCommandPolicy};
use kamome_core::error::Result;

use super::data_dir;
use super::page_script::{self, PageMessage};
use super::sample_commands;
use super::webview_channel::{OutboundScript, WebViewChannel};
use crate::state::{EventLog, LogLine};

/// Greeting sent from the native side on request.
pub const GREETING: &str = "Hello! by Rust ['\"+-._~\\@#$%^&*=,/?;:|{}]";

/// Forwards page console output to tracing and the UI log.
struct UiConsoleLogger {
    log: EventLog,
}

impl ConsoleLogger for UiConsoleLogger {
    fn console_log(&self, entry: &ConsoleEntry) {
        TracingConsoleLogger.console_log(entry);
        let prefix = match entry.level {
            ConsoleLevel::Log => "",
            ConsoleLevel::Warn => "warn: ",
            ConsoleLevel::Error => "error: ",
            ConsoleLevel::Assert => "assert: ",
        };
        self.log.page(format!("{prefix}{}", entry.message));
    }
}

/// Cheaply cloneable handle shared with every component via context.
#[derive(Clone)]
pub struct BridgeHost {
    client: Client,
    channel: Arc<WebViewChannel>,
    console: Arc<ConsoleLogAdapter>,
    log: EventLog,
    scripts: Arc<Mutex<Option<UnboundedReceiver<OutboundScript>>>>,
    events: Arc<Mutex<Option<UnboundedReceiver<LogLine>>>>,
}

impl BridgeHost {
    /// Build the bridge from the persisted configuration.
    pub fn start(runtime: Handle) -> Result<Self> {
        Self::start_with_config(runtime, load_config(&data_dir::config_path()))
    }

    /// Build the bridge, register the sample commands and queue the initial
    /// greeting. The greeting waits for the page's handshake.
    pub fn start_with_config(runtime: Handle, config: BridgeConfig) -> Result<Self> {
        let (log, events) = EventLog::channel();
        let (channel, scripts) = WebViewChannel::new();
        let channel = Arc::new(channel);

        let client = Client::with_runtime(channel.clone(), config, runtime.clone())?;
        sample_commands::register(&client, runtime, log.clone());

        let ready_log = log.clone();
        client.set_ready_listener(move || {
            info!("page handshake complete");
            ready_log.native("client is ready");
        });

        let host = Self {
            client,
            channel,
            console: Arc::new(ConsoleLogAdapter::new(Arc::new(UiConsoleLogger {
                log: log.clone(),
            }))),
            log,
            scripts: Arc::new(Mutex::new(Some(scripts))),
            events: Arc::new(Mutex::new(Some(events))),
        };

        info!(ready = host.client.is_ready(), "sending greeting before the page loads");
        host.send_greeting(json!({ "greeting": "Hi!" }))?;
        Ok(host)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send `greeting` to the page's receiver and log its answer.
    pub fn send_greeting(&self, data: serde_json::Value) -> Result<()> {
        let log = self.log.clone();
        let callback: SendCallback = Box::new(move |name, outcome| match outcome {
            Ok(result) => {
                let result = result.map(|r| r.to_string()).unwrap_or_else(|| "null".into());
                log.native(format!("{name} result: {result}"));
            }
            Err(reason) => log.native(format!("{name} failed: {reason}")),
        });

        self.log.native(format!("sending greeting: {data}"));
        self.client.send("greeting", Some(data), Some(callback))
    }

    pub fn send_default_greeting(&self) {
        if let Err(e) = self.send_greeting(json!({ "greeting": GREETING })) {
            warn!(error = %e, "greeting not sent");
            self.log.native(format!("greeting not sent: {e}"));
        }
    }

    /// Evaluate `document.title` through the result-capturing path.
    pub fn query_title(&self) {
        let log = self.log.clone();
        let outcome = self.channel.evaluate_with_result(
            "document.title".into(),
            Box::new(move |value| {
                log.native(format!("document.title = {}", value.as_deref().unwrap_or("null")));
            }),
        );
        if let Err(e) = outcome {
            warn!(error = %e, "title query failed");
        }
    }

    /// The UI log receiver. Only the first caller gets it.
    pub fn take_events(&self) -> Option<UnboundedReceiver<LogLine>> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn take_scripts(&self) -> Option<UnboundedReceiver<OutboundScript>> {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Connect the bridge to the page. Runs until the page or the channel
    /// goes away.
    pub async fn run_page_pump(&self) {
        let Some(mut scripts) = self.take_scripts() else {
            warn!("page pump already running");
            return;
        };

        let mut eval = document::eval(&page_script::bootstrap());
        info!("page pump started");

        loop {
            tokio::select! {
                outbound = scripts.recv() => match outbound {
                    Some(outbound) => {
                        if let Err(e) = eval.send(outbound) {
                            warn!(error = ?e, "failed to hand script to page");
                        }
                    }
                    None => break,
                },
                inbound = eval.recv::<PageMessage>() => match inbound {
                    Ok(message) => self.dispatch(message),
                    Err(e) => {
                        warn!(error = ?e, "page pump closed");
                        break;
                    }
                },
            }
        }

        let abandoned = self.channel.results().abandon_all();
        debug!(abandoned, "page pump stopped");
    }

    fn dispatch(&self, message: PageMessage) {
        match message {
            PageMessage::Message { body } => {
                // Malformed envelopes are already logged by the client.
                let _ = self.client.receive(&body);
            }
            PageMessage::Log { body } => {
                if let Err(e) = self.console.handle(&body) {
                    debug!(error = %e, "unreadable console entry");
                }
            }
            PageMessage::Result { id, body } => {
                self.channel.results().complete(id, body);
            }
        }
    }
}

/// Load the bridge configuration, writing defaults on first run.
fn load_config(path: &Path) -> BridgeConfig {
    if path.exists() {
        return match BridgeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid bridge config; using defaults");
                demo_defaults()
            }
        };
    }

    let config = demo_defaults();
    if let Err(e) = config.persist(path) {
        warn!(path = %path.display(), error = %e, "could not write default bridge config");
    }
    config
}

fn demo_defaults() -> BridgeConfig {
    BridgeConfig {
        non_existent_command: NonExistentCommandPolicy::Rejected,
        ..Default::default()
    }
}
