// Domain Layer - Pipeline descriptors, messages and queues

pub mod error;
pub mod message;
pub mod queue;
pub mod spec;

// Re-exports
pub use error::{ConfigError, QueueError};
pub use message::{Message, Payload};
pub use queue::{Queue, QueueName};
pub use spec::{PipelineSpec, QueueSpec, TimeoutPolicy, WorkerSpec};
