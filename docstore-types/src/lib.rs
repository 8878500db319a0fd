//! Core type definitions for docstore.
//!
//! This crate defines the storage-agnostic types shared by the repository
//! layer and the change-event publisher:
//! - Entity identifiers (`EntityId`, UUID v7) and partition keys (`HashKey`)
//! - Construction-time metadata every stored record carries (`EntityMeta`)
//! - The `Entity` trait record types implement to be stored
//! - Normalized change records fanned out to analytics sinks

mod change;
mod entity;
mod ids;

pub use change::{ChangeRecord, OperationType};
pub use entity::{DEFAULT_RETENTION_MONTHS, Entity, EntityMeta, SNAPSHOT_EXCLUDED_FIELDS};
pub use ids::{EntityId, HashKey};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid hash key: {0}")]
    InvalidHashKey(String),
}
