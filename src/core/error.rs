//! Error types for the Loki logger

use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Transport-level HTTP failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Push rejected by endpoint with status {status}: {body}")]
    PushRejected { status: u16, body: String },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Pending batch queue full, incoming record dropped
    #[error("Pending batch queue full: {pending}/{max} batches waiting")]
    QueueFull { pending: usize, max: usize },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Level that has no rendering (e.g. `None`)
    #[error("Invalid log level: '{level}'")]
    InvalidLevel { level: String },

    /// Operation on a disposed component
    #[error("{component} has been disposed")]
    Disposed { component: String },

    /// The push client panicked while delivering a batch
    #[error("Push client panicked: {0}")]
    WorkerPanicked(String),

    /// Background worker did not stop in time
    #[error("Batch worker did not stop within {timeout:?}")]
    ShutdownTimeout { timeout: Duration },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a disposed-state error
    pub fn disposed(component: impl Into<String>) -> Self {
        LoggerError::Disposed {
            component: component.into(),
        }
    }

    /// Create a rejected-push error
    pub fn push_rejected(status: u16, body: impl Into<String>) -> Self {
        LoggerError::PushRejected {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid level error
    pub fn invalid_level(level: impl ToString) -> Self {
        LoggerError::InvalidLevel {
            level: level.to_string(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
