//! Centralized error types for Newscast.

use thiserror::Error;

/// Main error type for Newscast operations.
#[derive(Error, Debug)]
pub enum NewscastError {
    #[error("Data source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for Newscast operations.
pub type NewscastResult<T> = Result<T, NewscastError>;

impl NewscastError {
    /// Wrap an error raised by an external data source.
    pub fn source<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source(Box::new(err))
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
