// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Home page: bridge status, demo actions and the event log.

use dioxus::prelude::*;

use crate::services::bridge_host::BridgeHost;
use crate::services::page_script::CALL_NATIVE_JS;
use crate::state::{AppState, LogSource};

#[component]
pub fn Home() -> Element {
    let state = use_context::<Signal<AppState>>();
    let host = use_context::<BridgeHost>();

    let ready = state.read().ready;
    let (status, colour) = if ready {
        ("Ready", "#34c759")
    } else {
        ("Waiting for page", "#ff9500")
    };

    rsx! {
        div {
            h1 { "Kamome" }
            p { style: "color: #666;", "Native commands and WebView receivers over one bridge" }

            p { style: "font-size: 14px;",
                "Bridge: "
                span { style: "color: {colour}; font-weight: 600;", "{status}" }
            }

            div { style: "display: flex; gap: 8px; margin: 16px 0;",
                ActionButton {
                    label: "Send greeting",
                    onclick: {
                        let host = host.clone();
                        move |_| host.send_default_greeting()
                    },
                }
                ActionButton {
                    label: "Call native commands",
                    onclick: move |_| {
                        tracing::info!("page calling native commands");
                        document::eval(CALL_NATIVE_JS);
                    },
                }
                ActionButton {
                    label: "Query title",
                    onclick: {
                        let host = host.clone();
                        move |_| host.query_title()
                    },
                }
            }

            h2 { "Events" }
            div { style: "font-family: ui-monospace, monospace; font-size: 12px; border: 1px solid #e0e0e0; border-radius: 8px; padding: 8px; max-height: 60vh; overflow-y: auto;",
                if state.read().lines.is_empty() {
                    p { style: "color: #888;", "Nothing yet." }
                }
                for (i, line) in state.read().lines.iter().enumerate() {
                    {
                        let time = line.at.format("%H:%M:%S%.3f").to_string();
                        let (tag, tag_colour) = match line.source {
                            LogSource::Native => ("native", "#007aff"),
                            LogSource::Page => ("page", "#af52de"),
                        };
                        rsx! {
                            div { key: "{i}", style: "padding: 2px 0;",
                                span { style: "color: #888;", "{time} " }
                                span { style: "color: {tag_colour};", "[{tag}] " }
                                span { "{line.text}" }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn ActionButton(label: &'static str, onclick: EventHandler<MouseEvent>) -> Element {
    rsx! {
        button {
            style: "padding: 8px 16px; border-radius: 8px; border: 1px solid #ccc; background: white;",
            onclick: move |evt| onclick.call(evt),
            "{label}"
        }
    }
}
