//! Error types shared across Taskflow crates

use thiserror::Error;

/// Result type alias for Taskflow operations
pub type Result<T> = std::result::Result<T, TaskflowError>;

/// Main error type for Taskflow
#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid environment value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

impl TaskflowError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
