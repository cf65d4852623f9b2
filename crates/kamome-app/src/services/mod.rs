// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: wires the bridge client to the Dioxus WebView.

pub mod bridge_host;
pub mod data_dir;
pub mod page_script;
pub mod sample_commands;
pub mod webview_channel;
