use crate::archive::{Archive, FakeArchive};
use crate::db::{Database, FakeDatabase};
use crate::ingest::{IngestError, StatusIngestor, StatusRequest};
use crate::registry::{DeviceRegistry, FakeRegistrar, Registrar};
use crate::test_utils::create_test_device;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_TYPE: i32 = 0;

/// Wiring with the in-process registry over the same fake store, the
/// shape the all-in-one binary uses
fn ingestor_with_registry() -> (
    FakeDatabase,
    FakeArchive,
    StatusIngestor<FakeDatabase, FakeArchive>,
) {
    let db = FakeDatabase::new();
    let archive = FakeArchive::new();
    let registrar: Arc<dyn Registrar> = Arc::new(DeviceRegistry::new(Arc::new(db.clone())));
    let ingestor = StatusIngestor::new(
        Arc::new(db.clone()),
        Arc::new(archive.clone()),
        registrar,
        DEFAULT_TYPE,
    );
    (db, archive, ingestor)
}

/// Wiring with a scripted fake collaborator, for asserting on the exact
/// requests it receives
fn ingestor_with_fake_registrar() -> (
    FakeDatabase,
    FakeArchive,
    FakeRegistrar,
    StatusIngestor<FakeDatabase, FakeArchive>,
) {
    let db = FakeDatabase::new();
    let archive = FakeArchive::new();
    let registrar = FakeRegistrar::new();
    let ingestor = StatusIngestor::new(
        Arc::new(db.clone()),
        Arc::new(archive.clone()),
        Arc::new(registrar.clone()),
        DEFAULT_TYPE,
    );
    (db, archive, registrar, ingestor)
}

#[tokio::test]
async fn test_end_to_end_unseen_serial() {
    let (db, archive, registrar, ingestor) = ingestor_with_fake_registrar();
    registrar.fake_set_device_id("SN-100", 7).await;

    let event = json!({"serial": "SN-100", "dn": "Kettle", "temp": 42});
    let receipt = ingestor.ingest(&event).await.unwrap();

    assert_eq!(receipt.device_id, 7);
    assert!(receipt.archived);

    // Collaborator saw the derived registration request
    let calls = registrar.fake_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].device_name, "Kettle");
    assert_eq!(calls[0].serial, "SN-100");
    assert_eq!(calls[0].device_type, DEFAULT_TYPE);

    // Status row holds the full input document
    let status = db.get_status(7).await.unwrap().unwrap();
    assert_eq!(status.status, event);

    // One history entry appended
    let entries = db.log_entries(7).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, event);

    // Raw payload archived under a serial-scoped key
    assert!(receipt.archive_key.starts_with("SN-100/"));
    assert!(receipt.archive_key.ends_with(".json"));
    let archived = archive.get_object(&receipt.archive_key).await.unwrap();
    let archived: serde_json::Value = serde_json::from_slice(&archived).unwrap();
    assert_eq!(archived, event);
}

#[tokio::test]
async fn test_unseen_serial_registers_through_registry() {
    let (db, _archive, ingestor) = ingestor_with_registry();

    let event = json!({"serial": "SN-100", "dn": "Kettle", "temp": 42});
    let receipt = ingestor.ingest(&event).await.unwrap();

    let device = db
        .find_device_by_serial("SN-100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(device.id, receipt.device_id);
    assert_eq!(device.name, "Kettle");
    assert_eq!(db.fake_device_count(), 1);
}

#[tokio::test]
async fn test_known_serial_skips_collaborator() {
    let (db, _archive, registrar, ingestor) = ingestor_with_fake_registrar();
    db.fake_add_device(create_test_device(3, "SN-100"));

    let event = json!({"serial": "SN-100", "temp": 42});
    let receipt = ingestor.ingest(&event).await.unwrap();

    assert_eq!(receipt.device_id, 3);
    assert!(
        registrar.fake_calls().await.is_empty(),
        "No registration call expected for a known serial"
    );
    assert_eq!(db.fake_device_count(), 1);
}

#[tokio::test]
async fn test_repeated_report_overwrites_status_and_grows_history() {
    let (db, _archive, ingestor) = ingestor_with_registry();

    ingestor
        .ingest(&json!({"serial": "SN-100", "temp": 40}))
        .await
        .unwrap();
    let receipt = ingestor
        .ingest(&json!({"serial": "SN-100", "temp": 42}))
        .await
        .unwrap();

    let status = db.get_status(receipt.device_id).await.unwrap().unwrap();
    assert_eq!(status.status, json!({"serial": "SN-100", "temp": 42}));

    let entries = db.log_entries(receipt.device_id).await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_missing_identifier_writes_nothing() {
    let (db, archive, registrar, ingestor) = ingestor_with_fake_registrar();

    let result = ingestor.ingest(&json!({"temp": 42})).await;
    assert!(matches!(result, Err(IngestError::MissingIdentifier)));

    assert_eq!(db.fake_device_count(), 0);
    assert_eq!(db.fake_log_count(), 0);
    assert_eq!(archive.fake_object_count().await, 0);
    assert!(registrar.fake_calls().await.is_empty());
}

#[tokio::test]
async fn test_unparseable_body_is_a_bad_request() {
    let (_db, _archive, _registrar, ingestor) = ingestor_with_fake_registrar();

    let result = ingestor.ingest(&json!({"body": "not json"})).await;
    assert!(matches!(result, Err(IngestError::BadRequest(_))));

    let result = ingestor.ingest(&json!([1, 2, 3])).await;
    assert!(matches!(result, Err(IngestError::BadRequest(_))));
}

#[tokio::test]
async fn test_registration_failure_writes_nothing() {
    let (db, archive, registrar, ingestor) = ingestor_with_fake_registrar();
    registrar.fake_fail(true).await;

    let result = ingestor
        .ingest(&json!({"serial": "SN-100", "temp": 42}))
        .await;
    assert!(matches!(result, Err(IngestError::Registration(_))));

    assert_eq!(db.fake_log_count(), 0);
    assert!(db.get_status(1).await.unwrap().is_none());
    assert_eq!(archive.fake_object_count().await, 0);
}

#[tokio::test]
async fn test_store_failure_aborts_before_archiving() {
    let (db, archive, ingestor) = ingestor_with_registry();
    let device = create_test_device(3, "SN-100");
    db.fake_add_device(device);
    db.fake_fail_writes(true);

    let result = ingestor
        .ingest(&json!({"serial": "SN-100", "temp": 42}))
        .await;
    assert!(matches!(result, Err(IngestError::Database(_))));
    assert_eq!(archive.fake_object_count().await, 0);
}

#[tokio::test]
async fn test_archive_failure_does_not_fail_the_request() {
    let (db, archive, ingestor) = ingestor_with_registry();
    archive.fake_fail_all(true).await;

    let receipt = ingestor
        .ingest(&json!({"serial": "SN-100", "temp": 42}))
        .await
        .unwrap();

    assert!(!receipt.archived);
    // The relational writes still committed
    assert!(db.get_status(receipt.device_id).await.unwrap().is_some());
    assert_eq!(db.fake_log_count(), 1);
}

#[tokio::test]
async fn test_concurrent_ingestion_of_unseen_serial() {
    let (db, _archive, ingestor) = ingestor_with_registry();
    let ingestor = Arc::new(ingestor);

    let mut handles = Vec::new();
    for i in 0..5 {
        let ingestor = ingestor.clone();
        handles.push(tokio::spawn(async move {
            ingestor
                .ingest(&json!({"serial": "SN-100", "temp": 40 + i}))
                .await
                .unwrap()
                .device_id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    assert_eq!(db.fake_device_count(), 1, "Exactly one device row expected");
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(db.fake_log_count(), 5);
}

#[tokio::test]
async fn test_payload_type_overrides_default() {
    let (_db, _archive, registrar, ingestor) = ingestor_with_fake_registrar();

    ingestor
        .ingest(&json!({"serial": "SN-100", "type": 4}))
        .await
        .unwrap();

    let calls = registrar.fake_calls().await;
    assert_eq!(calls[0].device_type, 4);
}

#[test]
fn test_request_from_inline_event() {
    let request =
        StatusRequest::from_event(&json!({"serial": "SN-100", "dn": "Kettle", "temp": 42}))
            .unwrap();
    assert_eq!(request.serial, "SN-100");
    assert_eq!(request.display_name, "Kettle");
    assert_eq!(request.document["temp"], 42);
}

#[test]
fn test_request_from_string_body() {
    let request = StatusRequest::from_event(&json!({
        "body": r#"{"serial": "SN-100", "temp": 42}"#
    }))
    .unwrap();
    assert_eq!(request.serial, "SN-100");
    // The serial doubles as display name when dn is absent
    assert_eq!(request.display_name, "SN-100");
    assert_eq!(request.document, json!({"serial": "SN-100", "temp": 42}));
}

#[test]
fn test_request_from_object_body() {
    let request = StatusRequest::from_event(&json!({
        "body": {"dn": "Kettle", "temp": 42}
    }))
    .unwrap();
    // Legacy dn fallback identifies the device
    assert_eq!(request.serial, "Kettle");
    assert_eq!(request.display_name, "Kettle");
}

#[test]
fn test_request_rejects_empty_serial() {
    let result = StatusRequest::from_event(&json!({"serial": ""}));
    assert!(matches!(result, Err(IngestError::MissingIdentifier)));
}

#[test]
fn test_request_ignores_non_numeric_type() {
    let request =
        StatusRequest::from_event(&json!({"serial": "SN-100", "type": "kettle"})).unwrap();
    assert!(request.device_type.is_none());
}
