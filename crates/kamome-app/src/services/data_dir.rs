// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution for the desktop demo.

use std::path::PathBuf;

const CONFIG_FILE: &str = "bridge.json";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join("kamome");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Location of the persisted bridge configuration.
pub fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

fn base_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    std::env::temp_dir()
}
