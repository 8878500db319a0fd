//! Error types for the storage layer.

use docstore_events::EventError;
use std::time::Duration;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The named table does not exist in the backing store.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Table name rejected by the naming rules.
    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    /// The remote table no longer matches the cached handle.
    #[error("schema drift on table {table}: {reason}")]
    SchemaDrift { table: String, reason: String },

    /// A stored row could not be decoded into the entity type.
    #[error("failed to decode row from table {table}: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Change-event publisher could not be built.
    #[error("events error: {0}")]
    Events(#[from] EventError),

    /// A facade operation failed.
    #[error("{operation} on {entity_type} ({target}) failed after {elapsed:?}: {source}")]
    Operation {
        operation: &'static str,
        entity_type: &'static str,
        target: String,
        elapsed: Duration,
        #[source]
        source: Box<StorageError>,
    },

    /// Invariant violated inside the storage layer.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Whether this error means the cached table handle is stale.
    pub fn is_schema_drift(&self) -> bool {
        matches!(
            self.root(),
            Self::SchemaDrift { .. } | Self::Decode { .. }
        )
    }

    /// Whether this error means the store could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.root(), Self::Unavailable(_))
    }

    /// Returns the innermost error, looking through operation context.
    pub fn root(&self) -> &StorageError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}
