// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kamome desktop demo
//
// Entry point. Initialises logging and the bridge host, then launches the
// Dioxus UI, whose own WebView doubles as the page the bridge talks to.

mod pages;
mod services;
mod state;

use dioxus::prelude::*;

use pages::home::Home;
use services::bridge_host::BridgeHost;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Kamome demo starting");

    // Readiness retries and slow commands run here, independent of the UI.
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start the bridge runtime");
            std::process::exit(1);
        }
    };

    let host = match BridgeHost::start(runtime.handle().clone()) {
        Ok(host) => host,
        Err(e) => {
            tracing::error!(error = %e, "failed to start the bridge");
            std::process::exit(1);
        }
    };

    dioxus::LaunchBuilder::new().with_context(host).launch(app);
}

/// Root component.
fn app() -> Element {
    let host = use_context::<BridgeHost>();
    let mut state = use_context_provider(|| Signal::new(state::AppState::default()));

    // Connect the bridge to this document.
    let pump_host = host.clone();
    use_future(move || {
        let host = pump_host.clone();
        async move { host.run_page_pump().await }
    });

    // Drain bridge events into the UI.
    use_future(move || {
        let host = host.clone();
        async move {
            let Some(mut events) = host.take_events() else {
                return;
            };
            while let Some(line) = events.recv().await {
                let ready = host.client().is_ready();
                let mut current = state.write();
                current.ready = ready;
                current.push(line);
            }
        }
    });

    rsx! {
        div {
            style: "display: flex; flex-direction: column; height: 100vh; font-family: system-ui, -apple-system, sans-serif; padding: 16px;",
            Home {}
        }
    }
}
