//! Health sentinel and probe.

use crate::store::DocumentStore;
use chrono::Months;
use docstore_types::{Entity, EntityId, EntityMeta};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Table base name of the health sentinel.
pub const HEALTH_ENTITY_TYPE: &str = "HealthCheck";

/// Fixed id of the health sentinel.
pub const SENTINEL_ID: EntityId = EntityId::from_uuid(Uuid::from_u128(1));

const SENTINEL_RETENTION_MONTHS: u32 = 120;

/// The single record whose presence proves the store is reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(flatten)]
    meta: EntityMeta,
    pub note: String,
}

impl HealthRecord {
    /// Builds the sentinel, expiring ten years from now.
    pub fn sentinel() -> Self {
        let meta = EntityMeta::with_id(SENTINEL_ID);
        let expires_at = meta
            .created_at()
            .checked_add_months(Months::new(SENTINEL_RETENTION_MONTHS))
            .unwrap_or(meta.expires_at());
        Self {
            meta: meta.expiring_at(expires_at),
            note: "health check sentinel".to_string(),
        }
    }
}

impl Entity for HealthRecord {
    const ENTITY_TYPE: &'static str = HEALTH_ENTITY_TYPE;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

/// Adapter for an external health-check endpoint.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    store: Arc<DocumentStore>,
}

impl HealthProbe {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Reports sentinel presence; any error counts as unhealthy.
    pub fn is_healthy(&self) -> bool {
        match self.store.ping() {
            Ok(found) => {
                if !found {
                    warn!("health sentinel not found");
                }
                found
            }
            Err(e) => {
                error!(error = %e, "health check failed");
                false
            }
        }
    }

    /// Runs [`is_healthy`](Self::is_healthy) on the blocking pool.
    pub async fn check(&self) -> bool {
        let probe = self.clone();
        match tokio::task::spawn_blocking(move || probe.is_healthy()).await {
            Ok(healthy) => healthy,
            Err(e) => {
                error!(error = %e, "health check task failed");
                false
            }
        }
    }
}
