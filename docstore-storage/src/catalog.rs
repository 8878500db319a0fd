//! Explicit list of entity types whose tables are ensured at startup.

use crate::error::StorageResult;
use crate::registry::TableRegistry;
use docstore_types::Entity;
use std::any::TypeId;

type EnsureFn = fn(&TableRegistry) -> StorageResult<()>;

struct CatalogEntry {
    type_id: TypeId,
    entity_type: &'static str,
    ensure: EnsureFn,
}

/// Entity types known to the composition root.
///
/// ```
/// use docstore_storage::EntityCatalog;
/// # use docstore_types::{Entity, EntityMeta};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Clone, Serialize, Deserialize)]
/// # struct Order { #[serde(flatten)] meta: EntityMeta }
/// # impl Entity for Order {
/// #     const ENTITY_TYPE: &'static str = "Order";
/// #     fn meta(&self) -> &EntityMeta { &self.meta }
/// # }
///
/// let catalog = EntityCatalog::new().register::<Order>().register::<Order>();
/// assert_eq!(catalog.entity_types(), vec!["Order"]);
/// ```
#[derive(Default)]
pub struct EntityCatalog {
    entries: Vec<CatalogEntry>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T`. Registering a type twice has no effect.
    pub fn register<T: Entity>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        if !self.entries.iter().any(|e| e.type_id == type_id) {
            self.entries.push(CatalogEntry {
                type_id,
                entity_type: T::ENTITY_TYPE,
                ensure: ensure_table::<T>,
            });
        }
        self
    }

    /// Registered entity type names, in registration order.
    pub fn entity_types(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.entity_type).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the table handle for every registered type, stopping at the
    /// first failure.
    pub(crate) fn ensure_all(&self, registry: &TableRegistry) -> StorageResult<()> {
        for entry in &self.entries {
            (entry.ensure)(registry)?;
        }
        Ok(())
    }
}

fn ensure_table<T: Entity>(registry: &TableRegistry) -> StorageResult<()> {
    registry.get_or_create::<T>().map(|_| ())
}

impl std::fmt::Debug for EntityCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entity_types()).finish()
    }
}
