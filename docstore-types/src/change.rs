//! Change records describing a completed mutation.
//!
//! A change record is built once per successful write and handed to the
//! analytics sinks. It is never persisted by the repository itself.

use crate::{Entity, SNAPSHOT_EXCLUDED_FIELDS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation a change record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Insert,
    Update,
    Remove,
}

impl OperationType {
    /// Returns the wire name of the operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Remove => "Remove",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized description of a mutation, as delivered to sinks.
///
/// Serializes to
/// `{"service", "operationType", "entity", "entityType", "timestampUtc"}`
/// where `entity` is the JSON text of the entity snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Name of the service that performed the mutation.
    pub service: String,
    /// What happened.
    pub operation_type: OperationType,
    /// Serialized entity snapshot.
    pub entity: String,
    /// Entity type name.
    pub entity_type: String,
    /// When the record was built.
    pub timestamp_utc: DateTime<Utc>,
}

impl ChangeRecord {
    /// Creates a change record from an already-serialized snapshot.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        operation_type: OperationType,
        entity_type: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            operation_type,
            entity: entity.into(),
            entity_type: entity_type.into(),
            timestamp_utc: Utc::now(),
        }
    }

    /// Builds a change record for `entity`.
    ///
    /// The snapshot omits the construction and expiry timestamps.
    pub fn from_entity<T: Entity>(
        service: &str,
        operation_type: OperationType,
        entity: &T,
    ) -> crate::Result<Self> {
        let mut snapshot = serde_json::to_value(entity)?;
        if let Some(fields) = snapshot.as_object_mut() {
            for field in SNAPSHOT_EXCLUDED_FIELDS {
                fields.remove(field);
            }
        }
        Ok(Self::new(
            service,
            operation_type,
            T::ENTITY_TYPE,
            serde_json::to_string(&snapshot)?,
        ))
    }

    /// Parses the snapshot back into a JSON value.
    pub fn snapshot(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.entity)?)
    }

    /// Serializes the record to its wire form.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
