//! Transport error types.

use std::time::Duration;

use thiserror::Error;

pub type SinkResult<T> = Result<T, SinkError>;

/// Errors a sink can return from `submit`. The reporter logs and drops
/// the batch on any of them.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink rejected batch: {0}")]
    Rejected(String),
}
