use crate::{EntityId, HashKey};
use chrono::{DateTime, Months, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Default retention applied to `expires_at` at construction.
pub const DEFAULT_RETENTION_MONTHS: u32 = 18;

/// Metadata fields kept in storage but stripped from change-event snapshots.
pub const SNAPSHOT_EXCLUDED_FIELDS: [&str; 2] = ["created_at", "expires_at"];

/// Identity and lifecycle metadata carried by every stored entity.
///
/// All four fields are fixed at construction. Record types embed this with
/// `#[serde(flatten)]` so the fields sit at the top level of the stored
/// document. Nothing in the repository layer ever rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    id: EntityId,
    hash_key: HashKey,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl EntityMeta {
    /// Creates metadata with fresh identifiers and the default retention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(EntityId::new())
    }

    /// Creates metadata for a well-known record whose id is fixed in advance.
    ///
    /// The hash key is still freshly generated.
    #[must_use]
    pub fn with_id(id: EntityId) -> Self {
        let created_at = Utc::now();
        let expires_at = created_at
            .checked_add_months(Months::new(DEFAULT_RETENTION_MONTHS))
            .unwrap_or(created_at);
        Self {
            id,
            hash_key: HashKey::generate(),
            created_at,
            expires_at,
        }
    }

    /// Overrides the expiry hint.
    #[must_use]
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Returns the entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the partition key.
    #[must_use]
    pub fn hash_key(&self) -> &HashKey {
        &self.hash_key
    }

    /// Returns when the entity was constructed.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the store-side expiry hint.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// A record type that can be stored through the repository.
///
/// ```
/// use docstore_types::{Entity, EntityMeta};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Order {
///     #[serde(flatten)]
///     meta: EntityMeta,
///     customer_id: u64,
/// }
///
/// impl Entity for Order {
///     const ENTITY_TYPE: &'static str = "Order";
///
///     fn meta(&self) -> &EntityMeta {
///         &self.meta
///     }
/// }
///
/// let order = Order { meta: EntityMeta::new(), customer_id: 7 };
/// assert_eq!(order.id(), order.meta.id());
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Stable type name; used as the table base name and in change records.
    const ENTITY_TYPE: &'static str;

    /// Returns the entity's metadata.
    fn meta(&self) -> &EntityMeta;

    /// Returns the entity id.
    fn id(&self) -> EntityId {
        self.meta().id()
    }

    /// Returns the partition key.
    fn hash_key(&self) -> &HashKey {
        self.meta().hash_key()
    }
}
