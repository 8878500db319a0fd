//! In-memory backing store.
//!
//! Also exposes out-of-band administration hooks so callers can change a
//! table behind the repository's back, which is how drift and outages are
//! simulated.

use crate::backend::{
    BackingStore, KeySchema, StoredItem, TableDescription, TableSpec, WriteBatch, WriteOp,
    check_generation,
};
use crate::error::{StorageError, StorageResult};
use docstore_types::EntityId;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug)]
struct MemoryTable {
    description: TableDescription,
    rows: BTreeMap<EntityId, StoredItem>,
}

/// A backing store that keeps every table in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, MemoryTable>>,
    unavailable: AtomicBool,
    create_delay: Mutex<Duration>,
    create_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Administration ───────────────────────────────────────────

    /// Bumps the table's generation, keeping its rows.
    pub fn alter_table(&self, name: &str) -> StorageResult<TableDescription> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        table.description.generation = Uuid::new_v4();
        Ok(table.description.clone())
    }

    /// Replaces the table's key schema, keeping its rows.
    pub fn replace_key_schema(
        &self,
        name: &str,
        key_schema: KeySchema,
    ) -> StorageResult<TableDescription> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        table.description.key_schema = key_schema;
        table.description.generation = Uuid::new_v4();
        Ok(table.description.clone())
    }

    /// Writes a row directly, bypassing generation checks.
    pub fn insert_raw(&self, name: &str, item: StoredItem) -> StorageResult<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        table.rows.insert(item.id, item);
        Ok(())
    }

    /// Number of rows in a table, bypassing generation checks.
    pub fn row_count(&self, name: &str) -> usize {
        self.tables.read().get(name).map_or(0, |t| t.rows.len())
    }

    /// Makes every call fail with [`StorageError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Sleeps this long inside every table creation.
    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock() = delay;
    }

    /// Number of `create_table_if_not_exists` calls received.
    pub fn create_table_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory backend marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn current<'a>(
        tables: &'a HashMap<String, MemoryTable>,
        handle: &TableDescription,
    ) -> StorageResult<&'a MemoryTable> {
        let table = tables
            .get(&handle.name)
            .ok_or_else(|| StorageError::TableNotFound(handle.name.clone()))?;
        check_generation(handle, &table.description)?;
        Ok(table)
    }
}

impl BackingStore for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn create_table_if_not_exists(&self, spec: &TableSpec) -> StorageResult<TableDescription> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let delay = *self.create_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut tables = self.tables.write();
        let table = tables
            .entry(spec.name.clone())
            .or_insert_with(|| MemoryTable {
                description: TableDescription::new(spec),
                rows: BTreeMap::new(),
            });
        Ok(table.description.clone())
    }

    fn describe_table(&self, name: &str) -> StorageResult<Option<TableDescription>> {
        self.ensure_available()?;
        Ok(self.tables.read().get(name).map(|t| t.description.clone()))
    }

    fn list_tables(&self) -> StorageResult<Vec<String>> {
        self.ensure_available()?;
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn delete_table(&self, name: &str) -> StorageResult<bool> {
        self.ensure_available()?;
        Ok(self.tables.write().remove(name).is_some())
    }

    fn find_by_id(
        &self,
        table: &TableDescription,
        id: EntityId,
    ) -> StorageResult<Option<StoredItem>> {
        self.ensure_available()?;
        let tables = self.tables.read();
        let current = Self::current(&tables, table)?;
        Ok(current.rows.get(&id).cloned())
    }

    fn scan(&self, table: &TableDescription) -> StorageResult<Vec<StoredItem>> {
        self.ensure_available()?;
        let tables = self.tables.read();
        let current = Self::current(&tables, table)?;
        Ok(current.rows.values().cloned().collect())
    }

    fn submit(&self, table: &TableDescription, batch: WriteBatch) -> StorageResult<()> {
        self.ensure_available()?;
        let mut tables = self.tables.write();
        let current = tables
            .get_mut(&table.name)
            .ok_or_else(|| StorageError::TableNotFound(table.name.clone()))?;
        check_generation(table, &current.description)?;

        for op in batch.into_ops() {
            match op {
                WriteOp::Put(item) => {
                    current.rows.insert(item.id, item);
                }
                WriteOp::Delete { id } => {
                    current.rows.remove(&id);
                }
            }
        }
        Ok(())
    }
}
