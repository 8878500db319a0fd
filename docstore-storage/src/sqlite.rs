//! SQLite-backed store.
//!
//! Each logical table maps to one SQLite table holding `(id, hash_key,
//! document)` rows. A catalog table records the key schema and generation of
//! every logical table.

use crate::backend::{
    BackingStore, KeySchema, StoredItem, TableDescription, TableSpec, WriteBatch, WriteOp,
    check_generation,
};
use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use docstore_types::EntityId;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Persistent single-node backing store on SQLite.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS docstore_tables (
                name TEXT PRIMARY KEY,
                partition_key TEXT NOT NULL,
                sort_key TEXT,
                generation TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn row_table(name: &str) -> String {
        // Names are validated to [A-Za-z0-9_.-], so quoting is enough.
        format!("\"doc_{name}\"")
    }

    fn load_description(
        conn: &Connection,
        name: &str,
    ) -> StorageResult<Option<TableDescription>> {
        let row = conn
            .query_row(
                "SELECT name, partition_key, sort_key, generation, created_at
                 FROM docstore_tables WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((name, partition_key, sort_key, generation, created_at)) = row else {
            return Ok(None);
        };

        let generation = Uuid::parse_str(&generation)
            .map_err(|e| StorageError::Internal(format!("bad generation for {name}: {e}")))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StorageError::Internal(format!("bad created_at for {name}: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(TableDescription {
            name,
            key_schema: KeySchema {
                partition_key,
                sort_key,
            },
            generation,
            created_at,
        }))
    }

    fn require_current(conn: &Connection, handle: &TableDescription) -> StorageResult<()> {
        let current = Self::load_description(conn, &handle.name)?
            .ok_or_else(|| StorageError::TableNotFound(handle.name.clone()))?;
        check_generation(handle, &current)
    }

    fn decode_row(
        table: &str,
        id: String,
        hash_key: String,
        document: String,
    ) -> StorageResult<StoredItem> {
        let id = EntityId::parse(&id)
            .map_err(|e| StorageError::Internal(format!("bad row id in {table}: {e}")))?;
        let document = serde_json::from_str(&document).map_err(|source| StorageError::Decode {
            table: table.to_string(),
            source,
        })?;
        Ok(StoredItem {
            id,
            hash_key,
            document,
        })
    }
}

impl BackingStore for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn create_table_if_not_exists(&self, spec: &TableSpec) -> StorageResult<TableDescription> {
        let mut conn = self.conn.lock();
        if let Some(existing) = Self::load_description(&conn, &spec.name)? {
            return Ok(existing);
        }

        let description = TableDescription::new(spec);
        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                hash_key TEXT NOT NULL,
                document TEXT NOT NULL
            );",
            Self::row_table(&spec.name)
        ))?;
        tx.execute(
            "INSERT INTO docstore_tables (name, partition_key, sort_key, generation, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                description.name,
                description.key_schema.partition_key,
                description.key_schema.sort_key,
                description.generation.to_string(),
                description.created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        debug!(table = %spec.name, "sqlite table created");
        Ok(description)
    }

    fn describe_table(&self, name: &str) -> StorageResult<Option<TableDescription>> {
        let conn = self.conn.lock();
        Self::load_description(&conn, name)
    }

    fn list_tables(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name FROM docstore_tables ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn delete_table(&self, name: &str) -> StorageResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM docstore_tables WHERE name = ?1", params![name])?;
        if removed > 0 {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", Self::row_table(name)))?;
        }
        tx.commit()?;
        Ok(removed > 0)
    }

    fn find_by_id(
        &self,
        table: &TableDescription,
        id: EntityId,
    ) -> StorageResult<Option<StoredItem>> {
        let conn = self.conn.lock();
        Self::require_current(&conn, table)?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT id, hash_key, document FROM {} WHERE id = ?1",
                    Self::row_table(&table.name)
                ),
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, hash_key, document)| Self::decode_row(&table.name, id, hash_key, document))
            .transpose()
    }

    fn scan(&self, table: &TableDescription) -> StorageResult<Vec<StoredItem>> {
        let conn = self.conn.lock();
        Self::require_current(&conn, table)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, hash_key, document FROM {} ORDER BY id",
            Self::row_table(&table.name)
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, hash_key, document)| Self::decode_row(&table.name, id, hash_key, document))
            .collect()
    }

    fn submit(&self, table: &TableDescription, batch: WriteBatch) -> StorageResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::require_current(&tx, table)?;

        let row_table = Self::row_table(&table.name);
        for op in batch.into_ops() {
            match op {
                WriteOp::Put(item) => {
                    tx.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {row_table} (id, hash_key, document)
                             VALUES (?1, ?2, ?3)"
                        ),
                        params![
                            item.id.to_string(),
                            item.hash_key,
                            serde_json::to_string(&item.document)?,
                        ],
                    )?;
                }
                WriteOp::Delete { id } => {
                    tx.execute(
                        &format!("DELETE FROM {row_table} WHERE id = ?1"),
                        params![id.to_string()],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").finish_non_exhaustive()
    }
}
