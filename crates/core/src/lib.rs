// Pipewright Core - Pipeline topology, queues & lifecycle
// NO infrastructure dependencies: concrete workers live in adapter crates

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
