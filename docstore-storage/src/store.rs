//! The document store facade.

use crate::backend::BackingStore;
use crate::catalog::EntityCatalog;
use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use crate::filter::Filter;
use crate::health::{HealthRecord, SENTINEL_ID};
use crate::observe::OpTimer;
use crate::query::Query;
use crate::registry::TableRegistry;
use crate::table::Table;
use docstore_events::ChangePublisher;
use docstore_types::{Entity, EntityId, OperationType};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// CRUD and query operations over any [`Entity`] type.
///
/// Every call is synchronous and blocks on the backing store. Successful
/// mutations are handed to the [`ChangePublisher`]; its failures never reach
/// the caller.
///
/// When a call fails because its cached table handle is stale, the handle is
/// rebuilt once and the call retried.
pub struct DocumentStore {
    backend: Arc<dyn BackingStore>,
    registry: TableRegistry,
    publisher: ChangePublisher,
}

impl DocumentStore {
    /// Creates a store with no table prefix and no row cache.
    pub fn new(backend: Arc<dyn BackingStore>, publisher: ChangePublisher) -> Self {
        let registry = TableRegistry::new(Arc::clone(&backend), "");
        Self {
            backend,
            registry,
            publisher,
        }
    }

    /// Creates a store from configuration.
    ///
    /// `runtime` is where detached change deliveries run; see
    /// [`ChangePublisher::from_config`].
    pub fn with_config(
        backend: Arc<dyn BackingStore>,
        config: &StoreConfig,
        runtime: Option<Handle>,
    ) -> StorageResult<Self> {
        let publisher = ChangePublisher::from_config(&config.events, runtime)?;
        let registry = TableRegistry::new(Arc::clone(&backend), config.table_prefix.as_str())
            .with_cache(config.cache.clone());
        Ok(Self {
            backend,
            registry,
            publisher,
        })
    }

    /// Registry holding the table handle of each entity type.
    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Publisher every successful mutation is reported to.
    pub fn publisher(&self) -> &ChangePublisher {
        &self.publisher
    }

    /// Backing store the tables live in.
    pub fn backend(&self) -> &Arc<dyn BackingStore> {
        &self.backend
    }

    // ── Bootstrap ────────────────────────────────────────────────

    /// Ensures the table of every catalogued type and the health sentinel.
    ///
    /// Safe to call more than once.
    pub fn start(&self, catalog: &EntityCatalog) -> StorageResult<()> {
        let timer = OpTimer::start("start", HealthRecord::ENTITY_TYPE);
        let target = format!("{} entity types", catalog.len());

        let result = catalog
            .ensure_all(&self.registry)
            .and_then(|()| self.ensure_sentinel());
        match result {
            Ok(()) => {
                timer.succeeded(&target);
                info!(
                    entity_types = ?catalog.entity_types(),
                    backend = self.backend.name(),
                    "document store started"
                );
                Ok(())
            }
            Err(e) => Err(timer.failed(&target, e)),
        }
    }

    fn ensure_sentinel(&self) -> StorageResult<()> {
        self.with_table::<HealthRecord, _>("start", |table| {
            if table.find(SENTINEL_ID)?.is_some() {
                return Ok(());
            }
            let mut writes = table.pending();
            writes.insert(&HealthRecord::sentinel())?;
            table.submit(writes)?;
            info!(table = table.name(), "health sentinel created");
            Ok(())
        })
    }

    /// Reports whether the health sentinel can be read.
    ///
    /// Reads through the backend directly, so a missing sentinel table yields
    /// `false` rather than being recreated.
    pub fn ping(&self) -> StorageResult<bool> {
        let timer = OpTimer::start("ping", HealthRecord::ENTITY_TYPE);
        let name = self.registry.table_name::<HealthRecord>();

        let result = self.backend.describe_table(&name).and_then(|description| {
            let Some(description) = description else {
                return Ok(false);
            };
            match self.backend.find_by_id(&description, SENTINEL_ID) {
                Ok(found) => Ok(found.is_some()),
                Err(StorageError::TableNotFound(_)) => Ok(false),
                Err(e) => Err(e),
            }
        });

        match result {
            Ok(found) => {
                timer.succeeded(&SENTINEL_ID);
                Ok(found)
            }
            Err(e) => Err(timer.failed(&SENTINEL_ID, e)),
        }
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Inserts `entity`, replacing any row with the same id.
    pub fn put<T: Entity>(&self, entity: &T) -> StorageResult<()> {
        let id = entity.id();
        let timer = OpTimer::start("put", T::ENTITY_TYPE);

        let result = self.with_table::<T, _>("put", |table| {
            let mut writes = table.pending();
            writes.insert(entity)?;
            table.submit(writes)
        });

        match result {
            Ok(()) => {
                timer.succeeded(&id);
                self.publisher.publish(OperationType::Insert, entity);
                Ok(())
            }
            Err(e) => Err(timer.failed(&id, e)),
        }
    }

    /// Deletes every row matching `filter` and inserts `entity`, as one batch.
    ///
    /// Returns the number of rows that matched. The read and the write are not
    /// atomic with respect to other writers.
    pub fn put_replacing<T: Entity>(&self, entity: &T, filter: &Filter<T>) -> StorageResult<usize> {
        let timer = OpTimer::start("put_replacing", T::ENTITY_TYPE);

        let result = self.with_table::<T, _>("put_replacing", |table| {
            let matches = table.filter(filter)?;
            let mut writes = table.pending();
            for existing in &matches {
                writes.remove(existing);
            }
            writes.insert(entity)?;
            table.submit(writes)?;
            Ok(matches.len())
        });

        match result {
            Ok(replaced) => {
                timer.succeeded(filter);
                let operation = if replaced > 0 {
                    OperationType::Update
                } else {
                    OperationType::Insert
                };
                self.publisher.publish(operation, entity);
                Ok(replaced)
            }
            Err(e) => Err(timer.failed(filter, e)),
        }
    }

    /// Replaces the row with `entity`'s id.
    ///
    /// With no prior row this is a plain insert; an update event is published
    /// either way.
    pub fn update<T: Entity>(&self, entity: &T) -> StorageResult<()> {
        let id = entity.id();
        let timer = OpTimer::start("update", T::ENTITY_TYPE);

        let result = self.with_table::<T, _>("update", |table| {
            let existed = table.find(id)?.is_some();
            let mut writes = table.pending();
            if existed {
                writes.remove_id(id);
            }
            writes.insert(entity)?;
            table.submit(writes)?;
            Ok(existed)
        });

        match result {
            Ok(existed) => {
                if !existed {
                    info!(
                        entity_type = T::ENTITY_TYPE,
                        entity_id = %id,
                        "update found no existing row, inserted instead"
                    );
                }
                timer.succeeded(&id);
                self.publisher.publish(OperationType::Update, entity);
                Ok(())
            }
            Err(e) => Err(timer.failed(&id, e)),
        }
    }

    /// Deletes the entity with `id`, returning it if it existed.
    pub fn remove<T: Entity>(&self, id: EntityId) -> StorageResult<Option<T>> {
        self.remove_by_id::<T>("remove", id)
    }

    /// Deletes the stored row with `entity`'s id, returning what was stored.
    pub fn remove_entity<T: Entity>(&self, entity: &T) -> StorageResult<Option<T>> {
        self.remove_by_id::<T>("remove_entity", entity.id())
    }

    fn remove_by_id<T: Entity>(
        &self,
        operation: &'static str,
        id: EntityId,
    ) -> StorageResult<Option<T>> {
        let timer = OpTimer::start(operation, T::ENTITY_TYPE);

        let result = self.with_table::<T, _>(operation, |table| {
            let Some(existing) = table.find(id)? else {
                return Ok(None);
            };
            let mut writes = table.pending();
            writes.remove(&existing);
            table.submit(writes)?;
            Ok(Some(existing))
        });

        match result {
            Ok(removed) => {
                timer.succeeded(&id);
                if let Some(entity) = &removed {
                    self.publisher.publish(OperationType::Remove, entity);
                }
                Ok(removed)
            }
            Err(e) => Err(timer.failed(&id, e)),
        }
    }

    /// Deletes every entity matching `filter`. Publishes no change events.
    pub fn remove_where<T: Entity>(&self, filter: &Filter<T>) -> StorageResult<usize> {
        let timer = OpTimer::start("remove_where", T::ENTITY_TYPE);

        let result = self.with_table::<T, _>("remove_where", |table| {
            let matches = table.filter(filter)?;
            let mut writes = table.pending();
            for existing in &matches {
                writes.remove(existing);
            }
            table.submit(writes)?;
            Ok(matches)
        });

        match result {
            Ok(removed) => {
                for entity in &removed {
                    info!(
                        entity_type = T::ENTITY_TYPE,
                        entity_id = %entity.id(),
                        filter = %filter,
                        "removed by filter"
                    );
                }
                timer.succeeded(filter);
                Ok(removed.len())
            }
            Err(e) => Err(timer.failed(filter, e)),
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Looks an entity up by id. `Ok(None)` when no row has that id.
    pub fn get<T: Entity>(&self, id: EntityId) -> StorageResult<Option<T>> {
        self.read::<T, _>("get", &id, |table| table.find(id))
    }

    /// Entities matching `filter`, ordered by id.
    ///
    /// The rows are read eagerly; the returned iterator owns them and never
    /// touches the backend again.
    pub fn get_where<T: Entity>(&self, filter: &Filter<T>) -> StorageResult<std::vec::IntoIter<T>> {
        self.read::<T, _>("get_where", filter, |table| table.filter(filter))
            .map(Vec::into_iter)
    }

    /// Every entity of type `T`, ordered by id.
    pub fn get_table<T: Entity>(&self) -> StorageResult<Vec<T>> {
        self.read::<T, _>("get_table", &"*", |table| table.scan())
    }

    /// Entities matching `filter`, ordered by id, collected into a `Vec`.
    pub fn get_list<T: Entity>(&self, filter: &Filter<T>) -> StorageResult<Vec<T>> {
        self.read::<T, _>("get_list", filter, |table| table.filter(filter))
    }

    /// Starts a lazy query over `T`.
    pub fn query<T: Entity>(&self) -> Query<'_, T> {
        Query::new(self)
    }

    /// Number of stored entities of type `T`.
    pub fn count<T: Entity>(&self) -> StorageResult<u64> {
        self.read::<T, _>("count", &"*", |table| table.count())
    }

    /// Number of stored entities matching `filter`.
    pub fn count_where<T: Entity>(&self, filter: &Filter<T>) -> StorageResult<u64> {
        self.read::<T, _>("count_where", filter, |table| {
            Ok(table.filter(filter)?.len() as u64)
        })
    }

    // ── Internals ────────────────────────────────────────────────

    fn read<T: Entity, R>(
        &self,
        operation: &'static str,
        target: &dyn std::fmt::Display,
        f: impl FnMut(&Table<T>) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let timer = OpTimer::start(operation, T::ENTITY_TYPE);
        match self.with_table(operation, f) {
            Ok(value) => {
                timer.succeeded(target);
                Ok(value)
            }
            Err(e) => Err(timer.failed(target, e)),
        }
    }

    /// Runs `f` against the handle for `T`, rebuilding the handle and
    /// retrying once if `f` reports drift.
    fn with_table<T: Entity, R>(
        &self,
        operation: &'static str,
        mut f: impl FnMut(&Table<T>) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let table = self.registry.get_or_create::<T>()?;
        match f(&table) {
            Err(e) if e.is_schema_drift() => {
                warn!(
                    operation,
                    entity_type = T::ENTITY_TYPE,
                    table = table.name(),
                    error = %e,
                    "schema drift detected, rebuilding table handle"
                );
                self.registry.invalidate_handle(&table);
                let rebuilt = self.registry.get_or_create::<T>()?;
                f(&rebuilt)
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("backend", &self.backend.name())
            .field("registry", &self.registry)
            .field("publisher", &self.publisher)
            .finish()
    }
}
