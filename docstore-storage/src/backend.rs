//! Backing store abstraction.
//!
//! A [`BackingStore`] is the session object bound to the document store. The
//! repository only ever talks to it through this trait, so the remote store's
//! protocol stays behind the adapter.

use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use docstore_types::{Entity, EntityId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest table name the store accepts.
pub const MIN_TABLE_NAME_LEN: usize = 3;
/// Longest table name the store accepts.
pub const MAX_TABLE_NAME_LEN: usize = 255;

/// Partition and sort key attribute names of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl KeySchema {
    /// The layout every entity table uses: partitioned by hash key, sorted by id.
    pub fn entity_default() -> Self {
        Self {
            partition_key: "hash_key".to_string(),
            sort_key: Some("id".to_string()),
        }
    }
}

/// Request to create a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub key_schema: KeySchema,
}

impl TableSpec {
    /// Creates a table request after validating the name.
    pub fn new(name: impl Into<String>, key_schema: KeySchema) -> StorageResult<Self> {
        let name = name.into();
        validate_table_name(&name)?;
        Ok(Self { name, key_schema })
    }

    /// Request for the table holding entities of type `T`.
    pub fn for_entity<T: Entity>(name: impl Into<String>) -> StorageResult<Self> {
        Self::new(name, KeySchema::entity_default())
    }
}

/// What the store reports about an existing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub key_schema: KeySchema,
    /// Changes whenever the table's layout changes.
    pub generation: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TableDescription {
    /// Describes a freshly created table.
    pub fn new(spec: &TableSpec) -> Self {
        Self {
            name: spec.name.clone(),
            key_schema: spec.key_schema.clone(),
            generation: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}

/// One stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: EntityId,
    pub hash_key: String,
    pub document: serde_json::Value,
}

impl StoredItem {
    /// Serializes an entity into a row.
    pub fn from_entity<T: Entity>(entity: &T) -> StorageResult<Self> {
        Ok(Self {
            id: entity.id(),
            hash_key: entity.hash_key().to_string(),
            document: serde_json::to_value(entity)?,
        })
    }

    /// Decodes the row as `T`.
    pub fn decode<T: Entity>(&self, table: &str) -> StorageResult<T> {
        serde_json::from_value(self.document.clone()).map_err(|source| StorageError::Decode {
            table: table.to_string(),
            source,
        })
    }
}

/// A single write within a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace the row with the item's id.
    Put(StoredItem),
    /// Delete the row with this id, if any.
    Delete { id: EntityId },
}

/// Ordered writes applied atomically by [`BackingStore::submit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, item: StoredItem) {
        self.ops.push(WriteOp::Put(item));
    }

    pub fn delete(&mut self, id: EntityId) {
        self.ops.push(WriteOp::Delete { id });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Ids touched by the batch, in order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ops.iter().map(|op| match op {
            WriteOp::Put(item) => item.id,
            WriteOp::Delete { id } => *id,
        })
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Session object bound to a document store.
///
/// Every call is synchronous and runs on the calling thread. Operations that
/// take a [`TableDescription`] must reject it with
/// [`StorageError::SchemaDrift`] when its generation no longer matches the
/// table, before applying anything.
pub trait BackingStore: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Creates the table if it does not exist and describes it.
    fn create_table_if_not_exists(&self, spec: &TableSpec) -> StorageResult<TableDescription>;

    /// Describes a table, or `None` if it does not exist.
    fn describe_table(&self, name: &str) -> StorageResult<Option<TableDescription>>;

    /// Names of all tables, sorted.
    fn list_tables(&self) -> StorageResult<Vec<String>>;

    /// Deletes a table and its rows. Returns whether it existed.
    fn delete_table(&self, name: &str) -> StorageResult<bool>;

    /// Looks a row up by id.
    fn find_by_id(&self, table: &TableDescription, id: EntityId)
    -> StorageResult<Option<StoredItem>>;

    /// Returns every row, ordered by id.
    fn scan(&self, table: &TableDescription) -> StorageResult<Vec<StoredItem>>;

    /// Applies a batch of writes atomically and in order.
    fn submit(&self, table: &TableDescription, batch: WriteBatch) -> StorageResult<()>;
}

/// Validates a table name: 3 to 255 characters of `[A-Za-z0-9_.-]`.
pub fn validate_table_name(name: &str) -> StorageResult<()> {
    let len_ok = (MIN_TABLE_NAME_LEN..=MAX_TABLE_NAME_LEN).contains(&name.len());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(StorageError::InvalidTableName(name.to_string()))
    }
}

/// Rejects a handle whose generation differs from the table's current one.
pub(crate) fn check_generation(
    handle: &TableDescription,
    current: &TableDescription,
) -> StorageResult<()> {
    if handle.generation != current.generation {
        return Err(StorageError::SchemaDrift {
            table: handle.name.clone(),
            reason: format!(
                "generation changed from {} to {}",
                handle.generation, current.generation
            ),
        });
    }
    if handle.key_schema != current.key_schema {
        return Err(StorageError::SchemaDrift {
            table: handle.name.clone(),
            reason: "key schema changed".to_string(),
        });
    }
    Ok(())
}
