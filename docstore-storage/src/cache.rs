//! Optional read-through cache wrapped around a table handle.

use crate::backend::StoredItem;
use docstore_types::EntityId;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Settings for the per-table read-through cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether newly built table handles get a cache.
    pub enabled: bool,
    /// Maximum number of rows kept per table.
    pub max_capacity: u64,
    /// Time-to-live of a cached row (seconds).
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_capacity: 10_000,
            ttl_secs: 300,
        }
    }
}

/// Row cache for a single table, keyed by entity id.
pub trait TableCache: Send + Sync {
    fn get(&self, id: EntityId) -> Option<StoredItem>;

    fn put(&self, item: StoredItem);

    fn invalidate(&self, id: EntityId);

    fn clear(&self);
}

/// Bounded, TTL-evicting [`TableCache`] backed by moka.
pub struct MokaTableCache {
    table_name: String,
    rows: Cache<EntityId, StoredItem>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MokaTableCache {
    pub fn new(table_name: impl Into<String>, config: &CacheConfig) -> Self {
        let rows = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();
        Self {
            table_name: table_name.into(),
            rows,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Table this cache belongs to.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl TableCache for MokaTableCache {
    fn get(&self, id: EntityId) -> Option<StoredItem> {
        let found = self.rows.get(&id);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn put(&self, item: StoredItem) {
        self.rows.insert(item.id, item);
    }

    fn invalidate(&self, id: EntityId) {
        self.rows.invalidate(&id);
    }

    fn clear(&self) {
        self.rows.invalidate_all();
    }
}

impl std::fmt::Debug for MokaTableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaTableCache")
            .field("table_name", &self.table_name)
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
