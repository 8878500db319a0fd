use docstore_storage::{CacheConfig, StorageError, StoreConfig};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::path::PathBuf;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

// ── Defaults ─────────────────────────────────────────────────────

#[test]
fn defaults() {
    let config = StoreConfig::default();
    assert_eq!(config.table_prefix, "");
    assert_eq!(config.cache, CacheConfig::default());
    assert!(!config.cache.enabled);
    assert_eq!(config.events.service_name, "docstore");
    assert!(config.events.stream_dir.is_none());
    assert!(config.events.invocation_endpoint.is_none());
}

// ── JSON ─────────────────────────────────────────────────────────

#[test]
fn partial_json_keeps_defaults() {
    let config = StoreConfig::from_json(
        r#"{
            "table_prefix": "prod-",
            "cache": { "enabled": true },
            "events": { "service_name": "billing", "stream_dir": "/var/lib/docstore" }
        }"#,
    )
    .unwrap();

    assert_eq!(config.table_prefix, "prod-");
    assert!(config.cache.enabled);
    assert_eq!(config.cache.max_capacity, CacheConfig::default().max_capacity);
    assert_eq!(config.events.service_name, "billing");
    assert_eq!(config.events.stream_name, "repository-changes");
    assert_eq!(
        config.events.stream_dir,
        Some(PathBuf::from("/var/lib/docstore"))
    );
}

#[test]
fn malformed_json_is_config_error() {
    let err = StoreConfig::from_json(r#"{"cache": {"enabled": "sometimes"}}"#).unwrap_err();
    assert!(matches!(err, StorageError::Config(_)));
}

#[test]
fn from_file_reads_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docstore.json");
    std::fs::write(&path, r#"{"table_prefix": "file-"}"#).unwrap();

    let config = StoreConfig::from_file(&path).unwrap();
    assert_eq!(config.table_prefix, "file-");

    let missing = StoreConfig::from_file(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(missing, StorageError::Config(_)));
}

// ── Environment ──────────────────────────────────────────────────

#[test]
fn empty_environment_gives_defaults() {
    let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, StoreConfig::default());
}

#[test]
fn environment_overrides_every_field() {
    let config = StoreConfig::from_lookup(lookup(&[
        ("DOCSTORE_SERVICE_NAME", "orders"),
        ("DOCSTORE_TABLE_PREFIX", "qa."),
        ("DOCSTORE_STREAM_NAME", "order-changes"),
        ("DOCSTORE_STREAM_DIR", "/tmp/streams"),
        ("DOCSTORE_INVOCATION_ENDPOINT", "http://localhost:9000/changes"),
        ("DOCSTORE_INVOCATION_TIMEOUT_MS", "750"),
        ("DOCSTORE_CACHE_ENABLED", "yes"),
        ("DOCSTORE_CACHE_MAX_CAPACITY", "64"),
        ("DOCSTORE_CACHE_TTL_SECS", " 30 "),
    ]))
    .unwrap();

    assert_eq!(config.table_prefix, "qa.");
    assert_eq!(config.events.service_name, "orders");
    assert_eq!(config.events.stream_name, "order-changes");
    assert_eq!(config.events.stream_dir, Some(PathBuf::from("/tmp/streams")));
    assert_eq!(
        config.events.invocation_endpoint.as_deref(),
        Some("http://localhost:9000/changes")
    );
    assert_eq!(config.events.invocation_timeout_ms, 750);
    assert_eq!(
        config.cache,
        CacheConfig {
            enabled: true,
            max_capacity: 64,
            ttl_secs: 30,
        }
    );
}

#[test]
fn malformed_number_is_rejected() {
    let err = StoreConfig::from_lookup(lookup(&[("DOCSTORE_CACHE_TTL_SECS", "soon")])).unwrap_err();
    match err {
        StorageError::Config(message) => assert!(message.contains("DOCSTORE_CACHE_TTL_SECS")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_bool_is_rejected() {
    let err = StoreConfig::from_lookup(lookup(&[("DOCSTORE_CACHE_ENABLED", "maybe")])).unwrap_err();
    assert!(matches!(err, StorageError::Config(_)));
}

#[test]
fn bool_spellings() {
    for (raw, expected) in [("1", true), ("TRUE", true), ("on", true), ("0", false), ("No", false)] {
        let config = StoreConfig::from_lookup(lookup(&[("DOCSTORE_CACHE_ENABLED", raw)])).unwrap();
        assert_eq!(config.cache.enabled, expected, "{raw}");
    }
}
