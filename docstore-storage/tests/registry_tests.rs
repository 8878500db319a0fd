mod common;

use common::{Customer, Order};
use docstore_storage::{
    BackingStore, CacheConfig, MemoryBackend, StorageError, TableRegistry,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn make_registry(prefix: &str) -> (Arc<MemoryBackend>, TableRegistry) {
    let backend = Arc::new(MemoryBackend::new());
    let registry = TableRegistry::new(backend.clone(), prefix);
    (backend, registry)
}

// ── get_or_create ────────────────────────────────────────────────

#[test]
fn first_access_creates_table() {
    let (backend, registry) = make_registry("");

    let table = registry.get_or_create::<Order>().unwrap();

    assert_eq!(table.name(), "Order");
    assert_eq!(backend.list_tables().unwrap(), vec!["Order".to_string()]);
    assert_eq!(backend.create_table_calls(), 1);
}

#[test]
fn second_access_reuses_handle() {
    let (backend, registry) = make_registry("");

    let a = registry.get_or_create::<Order>().unwrap();
    let b = registry.get_or_create::<Order>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(backend.create_table_calls(), 1);
}

#[test]
fn prefix_is_applied() {
    let (backend, registry) = make_registry("prod.");

    registry.get_or_create::<Customer>().unwrap();

    assert_eq!(registry.table_name::<Order>(), "prod.Order");
    assert_eq!(backend.list_tables().unwrap(), vec!["prod.Customer".to_string()]);
}

#[test]
fn invalid_prefix_is_rejected() {
    let (backend, registry) = make_registry("bad prefix/");

    let err = registry.get_or_create::<Order>().err().unwrap();

    assert!(matches!(err, StorageError::InvalidTableName(_)));
    assert_eq!(backend.create_table_calls(), 0);
    assert!(registry.is_empty());
}

#[test]
fn concurrent_first_access_builds_one_handle() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_create_delay(Duration::from_millis(50));
    let registry = Arc::new(TableRegistry::new(backend.clone(), ""));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_or_create::<Order>().unwrap()
            })
        })
        .collect();

    let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(backend.create_table_calls(), 1);
    assert_eq!(registry.len(), 1);
    assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
}

#[test]
fn create_failure_propagates_and_is_not_cached() {
    let (backend, registry) = make_registry("");
    backend.set_unavailable(true);

    let err = registry.get_or_create::<Order>().err().unwrap();

    assert!(err.is_unavailable());
    assert!(!registry.is_cached::<Order>());
}

// ── Invalidation ─────────────────────────────────────────────────

#[test]
fn invalidate_forces_rebuild() {
    let (_backend, registry) = make_registry("");
    let first = registry.get_or_create::<Order>().unwrap();

    assert!(registry.invalidate::<Order>());
    assert!(!registry.invalidate::<Order>());
    let second = registry.get_or_create::<Order>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(registry.invalidations(), 1);
}

#[test]
fn stale_handle_is_invalidated_only_once() {
    let (_backend, registry) = make_registry("");
    let stale = registry.get_or_create::<Order>().unwrap();

    assert!(registry.invalidate_handle(&stale));
    let fresh = registry.get_or_create::<Order>().unwrap();
    assert!(!registry.invalidate_handle(&stale));

    assert!(registry.is_cached::<Order>());
    assert!(Arc::ptr_eq(&fresh, &registry.get_or_create::<Order>().unwrap()));
    assert_eq!(registry.invalidations(), 1);
}

#[test]
fn invalidating_one_type_keeps_others() {
    let (_backend, registry) = make_registry("");
    registry.get_or_create::<Order>().unwrap();
    registry.get_or_create::<Customer>().unwrap();

    registry.invalidate::<Order>();

    assert!(!registry.is_cached::<Order>());
    assert!(registry.is_cached::<Customer>());
}

// ── Drop ─────────────────────────────────────────────────────────

#[test]
fn drop_table_removes_handle_and_remote_table() {
    let (backend, registry) = make_registry("");
    registry.get_or_create::<Order>().unwrap();

    assert!(registry.drop_table::<Order>().unwrap());

    assert!(!registry.is_cached::<Order>());
    assert!(backend.describe_table("Order").unwrap().is_none());
    assert!(!registry.drop_table::<Order>().unwrap());
}

// ── Cache wiring ─────────────────────────────────────────────────

#[test]
fn handles_get_caches_only_when_enabled() {
    let backend = Arc::new(MemoryBackend::new());
    let plain = TableRegistry::new(backend.clone(), "");
    let cached = TableRegistry::new(backend.clone(), "c-").with_cache(CacheConfig {
        enabled: true,
        ..CacheConfig::default()
    });
    let disabled = TableRegistry::new(backend, "d-").with_cache(CacheConfig::default());

    assert!(!plain.get_or_create::<Order>().unwrap().is_cached());
    assert!(cached.get_or_create::<Order>().unwrap().is_cached());
    assert!(!disabled.get_or_create::<Order>().unwrap().is_cached());
}
