// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Correlation table for evaluate-and-capture-result calls.
//
// Script hosts report evaluation results asynchronously and often on a
// different thread from the one that asked. Each channel owns one table;
// registration and delivery both go through the same mutex so a result is
// handed to its callback at most once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::traits::EvalCallback;

/// Pending evaluation callbacks keyed by an id unique to this table.
#[derive(Default)]
pub struct ResultTable {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, EvalCallback>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `callback` and return the id the host must report back with.
    pub fn register(&self, callback: EvalCallback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);
        id
    }

    /// Deliver `value` to the callback registered under `id`.
    ///
    /// Returns `false` when nothing is waiting (already delivered or never
    /// registered).
    pub fn complete(&self, id: u64, value: Option<String>) -> bool {
        let callback = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        match callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => {
                debug!(eval_id = id, "no pending evaluation for result");
                false
            }
        }
    }

    /// Fail every pending evaluation with `None`, e.g. when the page goes away.
    pub fn abandon_all(&self) -> usize {
        let drained: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        let count = drained.len();
        for (_, callback) in drained {
            callback(None);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
