#![allow(dead_code)]

use docstore_events::ChangePublisher;
use docstore_events::mock::RecordingStreamingSink;
use docstore_storage::{DocumentStore, Filter, MemoryBackend};
use docstore_types::{Entity, EntityMeta};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub customer_id: u64,
    pub total_cents: i64,
    pub note: Option<String>,
}

impl Entity for Order {
    const ENTITY_TYPE: &'static str = "Order";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
}

impl Entity for Customer {
    const ENTITY_TYPE: &'static str = "Customer";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

pub fn make_order(customer_id: u64, total_cents: i64) -> Order {
    Order {
        meta: EntityMeta::new(),
        customer_id,
        total_cents,
        note: None,
    }
}

pub fn make_customer(name: &str) -> Customer {
    Customer {
        meta: EntityMeta::new(),
        name: name.into(),
    }
}

pub fn by_customer(customer_id: u64) -> Filter<Order> {
    Filter::new(format!("customer_id == {customer_id}"), move |o: &Order| {
        o.customer_id == customer_id
    })
}

/// A store over a fresh memory backend, with a recording streaming sink.
pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub sink: Arc<RecordingStreamingSink>,
    pub store: DocumentStore,
}

pub fn harness() -> Harness {
    harness_with_sink(Arc::new(RecordingStreamingSink::new()))
}

pub fn harness_with_sink(sink: Arc<RecordingStreamingSink>) -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    let publisher = ChangePublisher::new("orders-service", "repository-changes")
        .with_streaming_sink(sink.clone());
    let store = DocumentStore::new(backend.clone(), publisher);
    Harness {
        backend,
        sink,
        store,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
