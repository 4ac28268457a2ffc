// Port Layer - Interfaces implemented outside the core

pub mod providers; // For deterministic testing
pub mod worker;

// Re-exports
pub use providers::{IdProvider, TimeProvider};
pub use worker::{Emitter, Processor, Source, WorkerArgs, WorkerError, WorkerInstance, WorkerKind};
