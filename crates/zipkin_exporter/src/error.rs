//! Error types for configuration and delivery.

use thiserror::Error;

/// Errors raised while building an exporter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `serviceName` was missing or empty.
    #[error("service name must not be empty")]
    EmptyServiceName,

    /// The collector URL could not be parsed.
    #[error("invalid collector url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The configuration document was not valid JSON for this schema.
    #[error("failed to parse exporter config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error types for span export operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// Transport-layer error (connection refused, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// The collector answered with a non-success status
    #[error("collector responded with status {0}")]
    Status(u16),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// `export` was called outside a tokio runtime
    #[error("no async runtime available to deliver the batch")]
    NoRuntime,
}

impl ExportError {
    /// Returns `true` if the collector was reached and rejected the batch.
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Status(_))
    }
}

impl From<reqwest::Error> for ExportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Transport(err.to_string()),
        }
    }
}
