use docstore_events::mock::{RecordingInvocationSink, RecordingStreamingSink};
use docstore_events::{ChangePublisher, EventError, EventsConfig};
use docstore_types::{Entity, EntityMeta, OperationType};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Shipment {
    #[serde(flatten)]
    meta: EntityMeta,
    carrier: String,
    parcels: u32,
}

impl Entity for Shipment {
    const ENTITY_TYPE: &'static str = "Shipment";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn make_shipment(carrier: &str) -> Shipment {
    Shipment {
        meta: EntityMeta::new(),
        carrier: carrier.into(),
        parcels: 3,
    }
}

/// Entity whose serialization always fails.
#[derive(Debug, Clone, Deserialize)]
struct Unserializable {
    #[serde(flatten)]
    meta: EntityMeta,
}

impl Serialize for Unserializable {
    fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("refusing to serialize"))
    }
}

impl Entity for Unserializable {
    const ENTITY_TYPE: &'static str = "Unserializable";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

// ── Streaming sink ───────────────────────────────────────────────

#[test]
fn streaming_sink_receives_one_record_per_publish() {
    let sink = Arc::new(RecordingStreamingSink::new());
    let publisher =
        ChangePublisher::new("shipping", "repository-changes").with_streaming_sink(sink.clone());

    let shipment = make_shipment("dhl");
    publisher.publish(OperationType::Insert, &shipment);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].service, "shipping");
    assert_eq!(records[0].operation_type, OperationType::Insert);
    assert_eq!(records[0].entity_type, "Shipment");
    assert_eq!(sink.streams(), vec!["repository-changes".to_string()]);

    let snapshot = records[0].snapshot().unwrap();
    assert_eq!(snapshot["carrier"], "dhl");
    assert_eq!(snapshot["id"], shipment.id().to_string());
    assert!(snapshot.get("created_at").is_none());
    assert!(snapshot.get("expires_at").is_none());
}

#[test]
fn streaming_sink_failure_is_swallowed() {
    init_tracing();
    let sink = Arc::new(RecordingStreamingSink::failing());
    let publisher = ChangePublisher::new("shipping", "s").with_streaming_sink(sink.clone());

    publisher.publish(OperationType::Update, &make_shipment("ups"));
    publisher.publish(OperationType::Remove, &make_shipment("ups"));

    assert_eq!(sink.attempts(), 2);
    assert!(sink.records().is_empty());
}

#[test]
fn streaming_sink_panic_is_contained() {
    init_tracing();
    let sink = Arc::new(RecordingStreamingSink::panicking());
    let publisher = ChangePublisher::new("shipping", "s").with_streaming_sink(sink.clone());

    publisher.publish(OperationType::Insert, &make_shipment("fedex"));
    assert_eq!(sink.attempts(), 1);
}

#[test]
fn unserializable_entity_is_dropped() {
    init_tracing();
    let sink = Arc::new(RecordingStreamingSink::new());
    let publisher = ChangePublisher::new("shipping", "s").with_streaming_sink(sink.clone());

    publisher.publish(
        OperationType::Insert,
        &Unserializable {
            meta: EntityMeta::new(),
        },
    );

    assert_eq!(sink.attempts(), 0);
}

#[test]
fn disabled_publisher_has_no_sinks() {
    let publisher = ChangePublisher::disabled();
    assert!(!publisher.is_enabled());
    assert!(!publisher.has_streaming_sink());
    assert!(!publisher.has_invocation_sink());
    publisher.publish(OperationType::Insert, &make_shipment("dhl"));
}

// ── Invocation sink ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invocation_sink_receives_record_detached() {
    let sink = Arc::new(RecordingInvocationSink::new());
    let publisher = ChangePublisher::new("shipping", "s")
        .with_invocation_sink(sink.clone(), tokio::runtime::Handle::current());

    publisher.publish(OperationType::Remove, &make_shipment("dhl"));

    tokio::time::timeout(Duration::from_secs(5), sink.wait_for_attempts(1))
        .await
        .expect("invocation did not run");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].operation_type, OperationType::Remove);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invocation_failure_does_not_affect_streaming() {
    init_tracing();
    let streaming = Arc::new(RecordingStreamingSink::new());
    let invocation = Arc::new(RecordingInvocationSink::failing());
    let publisher = ChangePublisher::new("shipping", "s")
        .with_streaming_sink(streaming.clone())
        .with_invocation_sink(invocation.clone(), tokio::runtime::Handle::current());

    publisher.publish(OperationType::Insert, &make_shipment("dhl"));

    tokio::time::timeout(Duration::from_secs(5), invocation.wait_for_attempts(1))
        .await
        .expect("invocation did not run");

    assert_eq!(streaming.records().len(), 1);
    assert!(invocation.records().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn both_sinks_see_the_same_record() {
    let streaming = Arc::new(RecordingStreamingSink::new());
    let invocation = Arc::new(RecordingInvocationSink::new());
    let publisher = ChangePublisher::new("shipping", "s")
        .with_streaming_sink(streaming.clone())
        .with_invocation_sink(invocation.clone(), tokio::runtime::Handle::current());

    publisher.publish(OperationType::Update, &make_shipment("dhl"));

    tokio::time::timeout(Duration::from_secs(5), invocation.wait_for_attempts(1))
        .await
        .expect("invocation did not run");

    assert_eq!(streaming.records(), invocation.records());
}

// ── from_config ──────────────────────────────────────────────────

#[test]
fn from_config_without_sinks() {
    let publisher = ChangePublisher::from_config(&EventsConfig::default(), None).unwrap();
    assert!(!publisher.is_enabled());
    assert_eq!(publisher.service_name(), "docstore");
    assert_eq!(publisher.stream_name(), "repository-changes");
}

#[test]
fn from_config_with_stream_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = EventsConfig {
        service_name: "billing".into(),
        stream_dir: Some(dir.path().to_path_buf()),
        ..EventsConfig::default()
    };

    let publisher = ChangePublisher::from_config(&config, None).unwrap();
    assert!(publisher.has_streaming_sink());
    assert!(!publisher.has_invocation_sink());
    assert_eq!(publisher.service_name(), "billing");
}

#[test]
fn from_config_endpoint_without_runtime_fails() {
    let config = EventsConfig {
        invocation_endpoint: Some("http://127.0.0.1:9/changes".into()),
        ..EventsConfig::default()
    };

    let err = ChangePublisher::from_config(&config, None).unwrap_err();
    assert!(matches!(err, EventError::NoRuntime));
}

#[tokio::test]
async fn from_config_endpoint_uses_ambient_runtime() {
    let config = EventsConfig {
        invocation_endpoint: Some("http://127.0.0.1:9/changes".into()),
        ..EventsConfig::default()
    };

    let publisher = ChangePublisher::from_config(&config, None).unwrap();
    assert!(publisher.has_invocation_sink());
}

#[test]
fn from_config_rejects_non_http_endpoint() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();
    let config = EventsConfig {
        invocation_endpoint: Some("ftp://example.com".into()),
        ..EventsConfig::default()
    };

    let err = ChangePublisher::from_config(&config, Some(runtime.handle().clone())).unwrap_err();
    assert!(matches!(err, EventError::Config(_)));
}

#[test]
fn config_deserializes_with_defaults() {
    let config: EventsConfig =
        serde_json::from_str(r#"{"service_name":"orders","invocation_timeout_ms":250}"#).unwrap();
    assert_eq!(config.service_name, "orders");
    assert_eq!(config.stream_name, "repository-changes");
    assert_eq!(config.invocation_timeout_ms, 250);
    assert!(config.stream_dir.is_none());
}
