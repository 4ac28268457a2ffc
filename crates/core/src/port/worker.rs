// Worker Port - the contract every concrete worker satisfies
//
// Two variants:
// - Source: no input queue, runs once and returns
// - Processor (transform or sink): fed one payload at a time by the core loop
//
// Workers never touch queues directly. They receive an `Emitter`, which can
// only carry payloads, so a worker cannot forward a termination sentinel.

use crate::domain::{Message, Payload, Queue, QueueError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Worker failures
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Handling one message failed; the instance logs it and keeps going
    #[error("Message processing failed: {0}")]
    Processing(String),

    /// The instance cannot continue; it terminates
    #[error("Fatal instance error: {0}")]
    Fatal(String),
}

impl WorkerError {
    pub fn processing(reason: impl Into<String>) -> Self {
        WorkerError::Processing(reason.into())
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        WorkerError::Fatal(reason.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::Fatal(_))
    }
}

impl From<QueueError> for WorkerError {
    fn from(err: QueueError) -> Self {
        WorkerError::Fatal(err.to_string())
    }
}

/// Write side of an instance: every emitted payload goes to each output queue
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    queues: Vec<Arc<Queue>>,
}

impl Emitter {
    pub fn new(queues: Vec<Arc<Queue>>) -> Self {
        Self { queues }
    }

    pub fn emit(&self, payload: impl Into<Payload>) -> Result<(), QueueError> {
        let payload = payload.into();
        if let Some((last, rest)) = self.queues.split_last() {
            for queue in rest {
                queue.put(Message::Data(payload.clone()))?;
            }
            last.put(Message::Data(payload))?;
        }
        Ok(())
    }

    pub fn queue_names(&self) -> Vec<&str> {
        self.queues.iter().map(|q| q.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

/// Worker with no input queue
#[async_trait]
pub trait Source: Send {
    /// Produce everything, then return. Returning ends the instance.
    async fn run(&mut self, out: &Emitter) -> Result<(), WorkerError>;
}

/// Worker fed from an input queue (transform or sink)
#[async_trait]
pub trait Processor: Send {
    /// Handle one payload, emitting zero or more derived payloads
    async fn process(&mut self, payload: Payload, out: &Emitter) -> Result<(), WorkerError>;

    /// Called once after the sentinel is consumed, before the instance exits
    async fn finish(&mut self, _out: &Emitter) -> Result<(), WorkerError> {
        Ok(())
    }
}

/// Variant of a constructed worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Source,
    Processor,
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerKind::Source => write!(f, "source"),
            WorkerKind::Processor => write!(f, "transform/sink"),
        }
    }
}

/// A constructed, not yet running, worker
pub enum WorkerInstance {
    Source(Box<dyn Source>),
    Processor(Box<dyn Processor>),
}

impl WorkerInstance {
    pub fn source(source: impl Source + 'static) -> Self {
        WorkerInstance::Source(Box::new(source))
    }

    pub fn processor(processor: impl Processor + 'static) -> Self {
        WorkerInstance::Processor(Box::new(processor))
    }

    pub fn kind(&self) -> WorkerKind {
        match self {
            WorkerInstance::Source(_) => WorkerKind::Source,
            WorkerInstance::Processor(_) => WorkerKind::Processor,
        }
    }
}

impl std::fmt::Debug for WorkerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WorkerInstance({})", self.kind())
    }
}

/// Static construction inputs handed to a factory, once per instance
#[derive(Debug, Clone, Copy)]
pub struct WorkerArgs<'a> {
    pub pool: &'a str,
    pub instance: usize,
    pub input_values: &'a [Payload],
    pub params: &'a Payload,
}

impl<'a> WorkerArgs<'a> {
    /// Look up `params.<key>`
    pub fn param(&self, key: &str) -> Option<&'a Payload> {
        self.params.get(key)
    }
}
