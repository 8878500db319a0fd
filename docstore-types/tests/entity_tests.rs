use chrono::{Duration, Months, Utc};
use docstore_types::{ChangeRecord, Entity, EntityId, EntityMeta, OperationType};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Invoice {
    #[serde(flatten)]
    meta: EntityMeta,
    customer_id: u64,
    amount_cents: i64,
    memo: Option<String>,
}

impl Entity for Invoice {
    const ENTITY_TYPE: &'static str = "Invoice";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

fn invoice(customer_id: u64) -> Invoice {
    Invoice {
        meta: EntityMeta::new(),
        customer_id,
        amount_cents: 12_50,
        memo: Some("net 30".into()),
    }
}

// ── EntityMeta ───────────────────────────────────────────────────

#[test]
fn meta_assigns_distinct_identifiers() {
    let a = EntityMeta::new();
    let b = EntityMeta::new();
    assert_ne!(a.id(), b.id());
    assert_ne!(a.hash_key(), b.hash_key());
}

#[test]
fn meta_expiry_defaults_to_eighteen_months() {
    let meta = EntityMeta::new();
    let expected = meta.created_at().checked_add_months(Months::new(18)).unwrap();
    assert_eq!(meta.expires_at(), expected);
}

#[test]
fn meta_created_at_is_now() {
    let before = Utc::now();
    let meta = EntityMeta::new();
    let after = Utc::now();
    assert!(meta.created_at() >= before && meta.created_at() <= after);
}

#[test]
fn meta_with_fixed_id_keeps_it() {
    let id = EntityId::from_uuid(uuid::Uuid::from_u128(42));
    let a = EntityMeta::with_id(id);
    let b = EntityMeta::with_id(id);
    assert_eq!(a.id(), id);
    assert_eq!(b.id(), id);
    assert_ne!(a.hash_key(), b.hash_key());
}

#[test]
fn meta_expiring_at_overrides_expiry_only() {
    let meta = EntityMeta::new();
    let id = meta.id();
    let expiry = meta.created_at() + Duration::days(3650);
    let meta = meta.expiring_at(expiry);
    assert_eq!(meta.expires_at(), expiry);
    assert_eq!(meta.id(), id);
}

// ── Entity serialization ─────────────────────────────────────────

#[test]
fn entity_fields_are_flattened() {
    let inv = invoice(9);
    let value = serde_json::to_value(&inv).unwrap();
    let obj = value.as_object().unwrap();
    for field in ["id", "hash_key", "created_at", "expires_at", "customer_id"] {
        assert!(obj.contains_key(field), "missing {field}");
    }
    assert!(!obj.contains_key("meta"));
}

#[test]
fn entity_json_roundtrip_is_lossless() {
    let inv = invoice(3);
    let json = serde_json::to_string(&inv).unwrap();
    let back: Invoice = serde_json::from_str(&json).unwrap();
    assert_eq!(back, inv);
    assert_eq!(back.id(), inv.id());
    assert_eq!(back.hash_key(), inv.hash_key());
}

// ── ChangeRecord ─────────────────────────────────────────────────

#[test]
fn change_record_wire_shape() {
    let inv = invoice(123);
    let record = ChangeRecord::from_entity("billing", OperationType::Insert, &inv).unwrap();
    let wire: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

    assert_eq!(wire["service"], "billing");
    assert_eq!(wire["operationType"], "Insert");
    assert_eq!(wire["entityType"], "Invoice");
    assert!(wire["entity"].is_string());
    assert!(wire["timestampUtc"].is_string());
    assert_eq!(wire.as_object().unwrap().len(), 5);
}

#[test]
fn change_record_snapshot_omits_timestamps() {
    let inv = invoice(123);
    let record = ChangeRecord::from_entity("billing", OperationType::Update, &inv).unwrap();
    let snapshot = record.snapshot().unwrap();

    assert_eq!(snapshot["id"], inv.id().to_string());
    assert_eq!(snapshot["hash_key"], inv.hash_key().as_str());
    assert_eq!(snapshot["customer_id"], 123);
    assert!(snapshot.get("created_at").is_none());
    assert!(snapshot.get("expires_at").is_none());
}

#[test]
fn change_record_does_not_touch_entity() {
    let inv = invoice(5);
    let before = inv.clone();
    let _ = ChangeRecord::from_entity("svc", OperationType::Remove, &inv).unwrap();
    assert_eq!(inv, before);
}

#[test]
fn operation_type_names() {
    assert_eq!(OperationType::Insert.to_string(), "Insert");
    assert_eq!(OperationType::Update.as_str(), "Update");
    assert_eq!(serde_json::to_string(&OperationType::Remove).unwrap(), "\"Remove\"");
}

#[test]
fn change_record_parses_back() {
    let record = ChangeRecord::new("svc", OperationType::Insert, "Invoice", "{}");
    let json = record.to_json().unwrap();
    let parsed: ChangeRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}
