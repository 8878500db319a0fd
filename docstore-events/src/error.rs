//! Error types for change-event delivery.

use thiserror::Error;

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;

/// Errors that can occur while building or delivering change events.
#[derive(Debug, Error)]
pub enum EventError {
    /// IO error (file-backed sinks).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record could not be built from the entity.
    #[error("record error: {0}")]
    Record(#[from] docstore_types::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Sink endpoint answered with a non-success status.
    #[error("sink rejected record with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Sink refused the record for another reason.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// An invocation sink was configured without a Tokio runtime to run it on.
    #[error("no Tokio runtime available for the invocation sink")]
    NoRuntime,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
