//! Push delivery error types.

use newscast_core::NewscastError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Push target not found: {0}")]
    TargetNotFound(String),

    #[error("Push target {0} has no device token")]
    MissingToken(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data source error: {0}")]
    Source(#[from] NewscastError),
}

pub type PushResult<T> = Result<T, PushError>;
