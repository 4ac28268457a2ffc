// Domain Error Types

use std::time::Duration;
use thiserror::Error;

/// Build-time failures. Fatal: nothing has been started when one is returned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read pipeline document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed pipeline document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Duplicate queue name: {0}")]
    DuplicateQueue(String),

    #[error("Duplicate worker name: {0}")]
    DuplicateWorker(String),

    #[error("Empty name in {0}")]
    EmptyName(&'static str),

    #[error("Worker {worker} must run at least one instance")]
    NoInstances { worker: String },

    #[error("Worker {worker} references undeclared queue: {queue}")]
    UnknownQueue { worker: String, queue: String },

    #[error("Worker {worker}: no implementation registered for {location}.{class}")]
    UnknownImplementation {
        worker: String,
        location: String,
        class: String,
    },

    #[error("Worker {worker}: {reason}")]
    VariantMismatch { worker: String, reason: String },

    #[error("Worker {worker} rejected its parameters: {reason}")]
    InvalidParams { worker: String, reason: String },

    #[error("Worker cycle detected: {0}")]
    Cycle(String),
}

/// Queue access failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No message arrived within the bound. Recoverable; the caller decides.
    #[error("No message on queue {queue} within {timeout:?}")]
    Timeout { queue: String, timeout: Duration },

    /// Queue state is unusable (a holder panicked mid-operation)
    #[error("Queue {0} is poisoned")]
    Poisoned(String),
}

impl QueueError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueueError::Timeout { .. })
    }
}
