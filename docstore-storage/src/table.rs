//! Typed table handles.

use crate::backend::{BackingStore, StoredItem, TableDescription, WriteBatch};
use crate::cache::TableCache;
use crate::error::StorageResult;
use crate::filter::Filter;
use docstore_types::{Entity, EntityId};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;

/// Handle to the materialized table holding entities of type `T`.
///
/// A handle remembers the table description it was built from. Once the
/// remote table changes, every call through the handle fails with a drift
/// error until the registry rebuilds it.
pub struct Table<T: Entity> {
    description: TableDescription,
    backend: Arc<dyn BackingStore>,
    cache: Option<Arc<dyn TableCache>>,
    /// Bumped after every submit. A cache fill only lands if no submit
    /// finished between its backend read and the fill.
    write_epoch: Mutex<u64>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Table<T> {
    pub(crate) fn new(
        description: TableDescription,
        backend: Arc<dyn BackingStore>,
        cache: Option<Arc<dyn TableCache>>,
    ) -> Self {
        Self {
            description,
            backend,
            cache,
            write_epoch: Mutex::new(0),
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.description.name
    }

    pub fn description(&self) -> &TableDescription {
        &self.description
    }

    /// Whether reads by id go through a cache.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Looks an entity up by id, reading through the cache if present.
    pub fn find(&self, id: EntityId) -> StorageResult<Option<T>> {
        if let Some(item) = self.cache.as_ref().and_then(|c| c.get(id)) {
            return item.decode(self.name()).map(Some);
        }

        let epoch = *self.write_epoch.lock();
        let Some(item) = self.backend.find_by_id(&self.description, id)? else {
            return Ok(None);
        };
        let entity = item.decode(self.name())?;
        if let Some(cache) = &self.cache {
            let current = self.write_epoch.lock();
            if *current == epoch {
                cache.put(item);
            }
        }
        Ok(Some(entity))
    }

    /// Every entity in the table, ordered by id.
    pub fn scan(&self) -> StorageResult<Vec<T>> {
        self.backend
            .scan(&self.description)?
            .iter()
            .map(|item| item.decode(self.name()))
            .collect()
    }

    /// Entities matching `filter`, ordered by id.
    pub fn filter(&self, filter: &Filter<T>) -> StorageResult<Vec<T>> {
        let mut matched = self.scan()?;
        matched.retain(|entity| filter.matches(entity));
        Ok(matched)
    }

    /// Number of rows in the table.
    pub fn count(&self) -> StorageResult<u64> {
        Ok(self.backend.scan(&self.description)?.len() as u64)
    }

    /// Starts an empty set of pending writes.
    pub fn pending(&self) -> PendingWrites<T> {
        PendingWrites::default()
    }

    /// Submits pending writes as one batch.
    pub fn submit(&self, writes: PendingWrites<T>) -> StorageResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let batch = writes.batch;
        let touched: Vec<EntityId> = batch.ids().collect();
        let result = self.backend.submit(&self.description, batch);
        if let Some(cache) = &self.cache {
            let mut epoch = self.write_epoch.lock();
            *epoch = epoch.wrapping_add(1);
            for id in touched {
                cache.invalidate(id);
            }
        }
        result
    }
}

/// Writes collected against a table and submitted together.
pub struct PendingWrites<T: Entity> {
    batch: WriteBatch,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> PendingWrites<T> {
    /// Queues an insert (or replacement) of `entity`.
    pub fn insert(&mut self, entity: &T) -> StorageResult<()> {
        self.batch.put(StoredItem::from_entity(entity)?);
        Ok(())
    }

    /// Queues deletion of `entity`.
    pub fn remove(&mut self, entity: &T) {
        self.remove_id(entity.id());
    }

    /// Queues deletion of the row with `id`.
    pub fn remove_id(&mut self, id: EntityId) {
        self.batch.delete(id);
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}

impl<T: Entity> Default for PendingWrites<T> {
    fn default() -> Self {
        Self {
            batch: WriteBatch::new(),
            _entity: PhantomData,
        }
    }
}
