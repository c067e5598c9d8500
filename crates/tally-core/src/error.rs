//! Configuration error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for config validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while validating a `tally.toml` before the reporter runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("reporting interval must be greater than zero")]
    ZeroInterval,

    #[error("reporting interval {value:?} exceeds the maximum of {max:?}")]
    IntervalTooLong { value: String, max: Duration },

    #[error("max batch size must be within 1..={max}, got {value}")]
    InvalidBatchSize { value: usize, max: usize },

    #[error("percentile out of range [0, 1]: {0}")]
    InvalidPercentile(f64),

    #[error("invalid filter pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("http sink requires an endpoint")]
    MissingEndpoint,
}
