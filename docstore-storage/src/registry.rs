//! Type-indexed registry of table handles.

use crate::backend::{BackingStore, TableSpec};
use crate::cache::{CacheConfig, MokaTableCache, TableCache};
use crate::error::{StorageError, StorageResult};
use crate::table::Table;
use docstore_types::Entity;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};

type AnyTable = Arc<dyn Any + Send + Sync>;

/// Maps entity types to their table handles.
///
/// Handles are built lazily and kept until invalidated. A single mutex guards
/// the whole map, including the remote create call, so concurrent first
/// access to a type builds exactly one handle.
pub struct TableRegistry {
    backend: Arc<dyn BackingStore>,
    table_prefix: String,
    cache: Option<CacheConfig>,
    tables: Mutex<HashMap<TypeId, AnyTable>>,
    invalidations: AtomicU64,
}

impl TableRegistry {
    /// Creates an empty registry whose table names start with `table_prefix`.
    pub fn new(backend: Arc<dyn BackingStore>, table_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            table_prefix: table_prefix.into(),
            cache: None,
            tables: Mutex::new(HashMap::new()),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Gives every handle built from now on a read-through cache, if enabled.
    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.cache = config.enabled.then_some(config);
        self
    }

    /// Name of the table holding `T`.
    pub fn table_name<T: Entity>(&self) -> String {
        format!("{}{}", self.table_prefix, T::ENTITY_TYPE)
    }

    /// Returns the cached handle for `T`, creating the table and handle on
    /// first use.
    pub fn get_or_create<T: Entity>(&self) -> StorageResult<Arc<Table<T>>> {
        let key = TypeId::of::<T>();
        let mut tables = self.tables.lock();
        if let Some(existing) = tables.get(&key) {
            return downcast::<T>(Arc::clone(existing));
        }

        let name = self.table_name::<T>();
        let spec = TableSpec::for_entity::<T>(name.as_str())?;
        let started = Instant::now();

        let description = match self.backend.create_table_if_not_exists(&spec) {
            Ok(description) => description,
            Err(e) => {
                error!(
                    table = %name,
                    entity_type = T::ENTITY_TYPE,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "failed to create table"
                );
                return Err(e);
            }
        };

        if description.key_schema != spec.key_schema {
            return Err(StorageError::SchemaDrift {
                table: name,
                reason: format!(
                    "expected key schema {:?}, found {:?}",
                    spec.key_schema, description.key_schema
                ),
            });
        }

        let cache = self.cache.as_ref().map(|config| {
            Arc::new(MokaTableCache::new(name.as_str(), config)) as Arc<dyn TableCache>
        });
        let table = Arc::new(Table::<T>::new(
            description,
            Arc::clone(&self.backend),
            cache,
        ));
        tables.insert(key, Arc::clone(&table) as AnyTable);

        info!(
            table = %name,
            entity_type = T::ENTITY_TYPE,
            backend = self.backend.name(),
            duration_ms = started.elapsed().as_millis() as u64,
            "table handle created"
        );
        Ok(table)
    }

    /// Drops the cached handle for `T`, if any.
    pub fn invalidate<T: Entity>(&self) -> bool {
        let removed = self.tables.lock().remove(&TypeId::of::<T>()).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
            debug!(entity_type = T::ENTITY_TYPE, "table handle invalidated");
        }
        removed
    }

    /// Drops the cached handle for `T` only if it is still `handle`.
    ///
    /// Returns `false` when another caller already replaced it.
    pub fn invalidate_handle<T: Entity>(&self, handle: &Arc<Table<T>>) -> bool {
        let key = TypeId::of::<T>();
        let mut tables = self.tables.lock();
        let same = tables
            .get(&key)
            .is_some_and(|cached| std::ptr::addr_eq(Arc::as_ptr(cached), Arc::as_ptr(handle)));
        if same {
            tables.remove(&key);
            self.invalidations.fetch_add(1, Ordering::SeqCst);
            debug!(
                entity_type = T::ENTITY_TYPE,
                table = handle.name(),
                "stale table handle invalidated"
            );
        }
        same
    }

    /// Drops the handle for `T` and deletes its table.
    ///
    /// Administrative; not used on request paths.
    pub fn drop_table<T: Entity>(&self) -> StorageResult<bool> {
        let mut tables = self.tables.lock();
        tables.remove(&TypeId::of::<T>());
        let name = self.table_name::<T>();
        let existed = self.backend.delete_table(&name)?;
        info!(table = %name, entity_type = T::ENTITY_TYPE, existed, "table dropped");
        Ok(existed)
    }

    /// Whether a handle for `T` is cached.
    pub fn is_cached<T: Entity>(&self) -> bool {
        self.tables.lock().contains_key(&TypeId::of::<T>())
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.tables.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of handles dropped because of invalidation.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::SeqCst)
    }
}

fn downcast<T: Entity>(table: AnyTable) -> StorageResult<Arc<Table<T>>> {
    table.downcast::<Table<T>>().map_err(|_| {
        StorageError::Internal(format!(
            "table handle for {} has the wrong type",
            T::ENTITY_TYPE
        ))
    })
}

impl std::fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRegistry")
            .field("backend", &self.backend.name())
            .field("table_prefix", &self.table_prefix)
            .field("handles", &self.len())
            .field("invalidations", &self.invalidations())
            .finish()
    }
}
