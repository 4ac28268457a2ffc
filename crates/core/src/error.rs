// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::domain::ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] crate::domain::QueueError),

    #[error("Worker error: {0}")]
    Worker(#[from] crate::port::WorkerError),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the run was refused before any pool started
    pub fn is_config(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
