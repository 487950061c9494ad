//! Name-keyed handler lookup used when building tasks from definition files.

use std::collections::HashMap;

use super::{BoxTaskHandler, TaskHandler};

/// Maps handler names (as written in definition files) to handlers.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, BoxTaskHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, replacing any previous one.
    pub fn register<T: TaskHandler + 'static>(&mut self, name: impl Into<String>, handler: T) {
        self.handlers.insert(name.into(), BoxTaskHandler::new(handler));
    }

    /// Register an already-boxed handler.
    pub fn register_boxed(&mut self, name: impl Into<String>, handler: BoxTaskHandler) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&BoxTaskHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
