// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Named commands and the registry they live in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kamome_core::types::Payload;

use crate::completion::Completion;

/// Handler invoked with the command name, the optional payload and the
/// completion that must eventually be settled.
pub type Handler = Arc<dyn Fn(&str, Option<Payload>, Completion) + Send + Sync>;

/// A named command. A command without a handler is a no-op placeholder.
#[derive(Clone)]
pub struct Command {
    name: String,
    handler: Option<Handler>,
}

impl Command {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, Option<Payload>, Completion) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Some(Arc::new(handler)),
        }
    }

    /// A command that accepts calls and does nothing with them.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn execute(&self, data: Option<Payload>, completion: Completion) {
        if let Some(handler) = &self.handler {
            handler(&self.name, data, completion);
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

/// Name -> command storage. Pure storage: nothing here runs a handler.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `command`, replacing any command of the same name.
    pub fn add(&mut self, command: Command) -> &mut Self {
        self.commands.insert(command.name.clone(), command);
        self
    }

    /// Remove the command named `name`, if any.
    pub fn remove(&mut self, name: &str) -> Option<Command> {
        self.commands.remove(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
