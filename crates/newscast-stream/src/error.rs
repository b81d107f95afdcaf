//! Streaming error types.

use std::time::Duration;

use newscast_core::NewscastError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Client disconnected")]
    Disconnected,

    #[error("Write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Stream broadcaster is shutting down")]
    ShuttingDown,

    #[error("Invalid interval: {0} must be greater than zero and at most one day")]
    InvalidInterval(&'static str),

    #[error("No async runtime available to schedule {0}")]
    NoRuntime(&'static str),

    #[error("News source error: {0}")]
    Source(#[from] NewscastError),
}

pub type StreamResult<T> = Result<T, StreamError>;
