//! Generic per-entity-type document repository.
//!
//! [`DocumentStore`] gives CRUD and predicate queries over any
//! [`Entity`](docstore_types::Entity) without per-type code:
//!
//! - a [`TableRegistry`] creates each type's table on first use and caches
//!   the handle
//! - calls that hit a stale handle are retried once on a rebuilt one
//! - every successful mutation is published through a
//!   [`ChangePublisher`](docstore_events::ChangePublisher)
//!
//! Two backing stores ship with the crate: [`MemoryBackend`] and
//! [`SqliteBackend`].
//!
//! # Example
//!
//! ```
//! use docstore_events::ChangePublisher;
//! use docstore_storage::{DocumentStore, EntityCatalog, Filter, MemoryBackend};
//! use docstore_types::{Entity, EntityMeta};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Order {
//!     #[serde(flatten)]
//!     meta: EntityMeta,
//!     customer_id: u64,
//! }
//!
//! impl Entity for Order {
//!     const ENTITY_TYPE: &'static str = "Order";
//!     fn meta(&self) -> &EntityMeta {
//!         &self.meta
//!     }
//! }
//!
//! let store = DocumentStore::new(Arc::new(MemoryBackend::new()), ChangePublisher::disabled());
//! store.start(&EntityCatalog::new().register::<Order>())?;
//!
//! let order = Order { meta: EntityMeta::new(), customer_id: 123 };
//! store.put(&order)?;
//!
//! assert_eq!(store.get::<Order>(order.id())?, Some(order));
//! let by_customer = Filter::new("customer_id == 123", |o: &Order| o.customer_id == 123);
//! assert_eq!(store.count_where(&by_customer)?, 1);
//! assert!(store.ping()?);
//! # Ok::<(), docstore_storage::StorageError>(())
//! ```

mod backend;
mod cache;
mod catalog;
mod config;
mod error;
mod filter;
mod health;
mod memory;
mod observe;
mod query;
mod registry;
mod sqlite;
mod store;
mod table;

pub use backend::{
    BackingStore, KeySchema, MAX_TABLE_NAME_LEN, MIN_TABLE_NAME_LEN, StoredItem, TableDescription,
    TableSpec, WriteBatch, WriteOp, validate_table_name,
};
pub use cache::{CacheConfig, MokaTableCache, TableCache};
pub use catalog::EntityCatalog;
pub use config::StoreConfig;
pub use error::{StorageError, StorageResult};
pub use filter::Filter;
pub use health::{HEALTH_ENTITY_TYPE, HealthProbe, HealthRecord, SENTINEL_ID};
pub use memory::MemoryBackend;
pub use query::Query;
pub use registry::TableRegistry;
pub use sqlite::SqliteBackend;
pub use store::DocumentStore;
pub use table::{PendingWrites, Table};
