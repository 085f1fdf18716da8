//! Progress reporting sink injected into the pipeline.

use std::sync::Mutex;

/// Receives human-readable progress messages.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards messages to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}
}

/// Keeps every message in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: Mutex<Vec<String>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the messages received so far.
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, message: String) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.push(format!("warning: {}", message));
    }
}
