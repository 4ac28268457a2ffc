// Pipewright Built-in Workers
// Implements: Source / Processor ports, registered under `location: builtin`

pub mod forward;
pub mod jsonl_sink;
pub mod log_sink;
pub mod params;
pub mod scale;
pub mod value_source;

pub use forward::Forward;
pub use jsonl_sink::JsonLinesSink;
pub use log_sink::LogSink;
pub use scale::Scale;
pub use value_source::ValueSource;

use pipewright_core::application::WorkerRegistry;

/// Namespace the built-ins are registered under
pub const BUILTIN_LOCATION: &str = "builtin";

/// Add every built-in worker to `registry`
pub fn register_builtins(registry: &mut WorkerRegistry) -> &mut WorkerRegistry {
    registry
        .register_source(BUILTIN_LOCATION, "ValueSource", ValueSource::from_args)
        .register_processor(BUILTIN_LOCATION, "Scale", Scale::from_args)
        .register_processor(BUILTIN_LOCATION, "Forward", |_| Ok(Forward))
        .register_processor(BUILTIN_LOCATION, "LogSink", LogSink::from_args)
        .register_processor(BUILTIN_LOCATION, "JsonLinesSink", JsonLinesSink::from_args)
}

/// Registry holding only the built-ins
pub fn builtin_registry() -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    register_builtins(&mut registry);
    registry
}
