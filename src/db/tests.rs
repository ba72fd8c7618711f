use crate::db::{Database, DeviceUpdate, FakeDatabase, NewDevice, PostgresDatabase};
use crate::test_utils::{create_test_device, is_db_enabled, load_test_config};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;

fn kettle() -> NewDevice {
    NewDevice {
        name: "Kettle".to_string(),
        serial_number: "SN-100".to_string(),
        device_type: 0,
    }
}

#[tokio::test]
async fn test_find_or_create_is_idempotent() {
    let db = FakeDatabase::new();

    let first = db.find_or_create_device(kettle()).await.unwrap();
    let second = db.find_or_create_device(kettle()).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(db.fake_device_count(), 1);
    assert!(first.is_active);
}

#[tokio::test]
async fn test_concurrent_find_or_create_creates_single_row() {
    let db = Arc::new(FakeDatabase::new());

    let mut handles = Vec::new();
    for _ in 0..10 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.find_or_create_device(kettle()).await.unwrap().id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    assert_eq!(db.fake_device_count(), 1, "Exactly one device row expected");
    assert!(
        ids.windows(2).all(|pair| pair[0] == pair[1]),
        "All callers should resolve the same id"
    );
}

#[tokio::test]
async fn test_record_status_is_last_write_wins_with_full_history() {
    let db = FakeDatabase::new();
    let device = db.find_or_create_device(kettle()).await.unwrap();

    let first_at = Utc::now();
    db.record_status(device.id, &json!({"temp": 40}), first_at)
        .await
        .unwrap();
    db.record_status(device.id, &json!({"temp": 42}), first_at + Duration::seconds(1))
        .await
        .unwrap();

    let status = db.get_status(device.id).await.unwrap().unwrap();
    assert_eq!(status.status, json!({"temp": 42}));

    let entries = db.log_entries(device.id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, json!({"temp": 40}));
    assert_eq!(entries[1].status, json!({"temp": 42}));
}

#[tokio::test]
async fn test_get_status_returns_none_for_unknown_device() {
    let db = FakeDatabase::new();
    assert!(db.get_status(999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_device_unknown_id_matches_nothing() {
    let db = FakeDatabase::new();
    let update = DeviceUpdate {
        name: Some("Toaster".to_string()),
        ..Default::default()
    };
    assert!(!db.update_device(999, update).await.unwrap());
}

#[tokio::test]
async fn test_update_device_changes_only_provided_fields() {
    let db = FakeDatabase::new();
    let device = db.find_or_create_device(kettle()).await.unwrap();

    let update = DeviceUpdate {
        name: Some("Smart Kettle".to_string()),
        device_type: Some(2),
        ..Default::default()
    };
    assert!(db.update_device(device.id, update).await.unwrap());

    let updated = db
        .find_device_by_serial("SN-100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Smart Kettle");
    assert_eq!(updated.device_type, 2);
    assert_eq!(updated.serial_number, "SN-100");
}

#[tokio::test]
async fn test_deactivate_device_clears_active_flag() {
    let db = FakeDatabase::new();
    let device = db.find_or_create_device(kettle()).await.unwrap();

    db.deactivate_device(device.id).await.unwrap();

    let stored = db
        .find_device_by_serial("SN-100")
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_active);
}

#[tokio::test]
async fn test_list_devices_joins_latest_status() {
    let db = FakeDatabase::new();
    db.fake_add_device(create_test_device(7, "SN-7"));
    db.fake_add_device(create_test_device(8, "SN-8"));

    db.link_user_device(1, 7).await.unwrap();
    db.link_user_device(1, 8).await.unwrap();
    db.record_status(7, &json!({"temp": 42}), Utc::now())
        .await
        .unwrap();

    let devices = db.list_devices_for_user(1).await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_id, 7);
    assert_eq!(devices[0].status, json!({"temp": 42}));
    // No status row yet, reported as an empty document
    assert_eq!(devices[1].status, json!({}));
}

#[tokio::test]
async fn test_link_user_device_does_not_duplicate() {
    let db = FakeDatabase::new();
    db.fake_add_device(create_test_device(7, "SN-7"));

    db.link_user_device(1, 7).await.unwrap();
    db.link_user_device(1, 7).await.unwrap();

    let devices = db.list_devices_for_user(1).await.unwrap();
    assert_eq!(devices.len(), 1);
}

#[tokio::test]
async fn test_failed_writes_surface_as_errors() {
    let db = FakeDatabase::new();
    let device = db.find_or_create_device(kettle()).await.unwrap();
    db.fake_fail_writes(true);

    assert!(db
        .record_status(device.id, &json!({"temp": 42}), Utc::now())
        .await
        .is_err());
    assert!(db.find_or_create_device(kettle()).await.is_err());

    db.fake_fail_writes(false);
    assert!(db
        .record_status(device.id, &json!({"temp": 42}), Utc::now())
        .await
        .is_ok());
}

/// Round-trip against a real PostgreSQL instance, enabled with
/// ENABLE_DB_TESTS=true and a config.toml pointing at it. Runs in its own
/// schema so it never touches production tables.
#[tokio::test]
async fn test_postgres_roundtrip() {
    if !is_db_enabled() {
        return;
    }

    let config = load_test_config().expect("config.toml required for DB tests");
    let db = PostgresDatabase::new_with_schema(
        &config.database.url,
        config.database.max_connections,
        Some("ingestor_test".to_string()),
    )
    .await
    .expect("Failed to connect to test database");

    let serial = format!("SN-{}", uuid::Uuid::new_v4());
    let device = db
        .find_or_create_device(NewDevice {
            name: "Integration Kettle".to_string(),
            serial_number: serial.clone(),
            device_type: 1,
        })
        .await
        .unwrap();

    let again = db
        .find_or_create_device(NewDevice {
            name: "Renamed".to_string(),
            serial_number: serial.clone(),
            device_type: 1,
        })
        .await
        .unwrap();
    assert_eq!(device.id, again.id);

    db.record_status(device.id, &json!({"temp": 42}), Utc::now())
        .await
        .unwrap();
    db.record_status(device.id, &json!({"temp": 43}), Utc::now())
        .await
        .unwrap();

    let status = db.get_status(device.id).await.unwrap().unwrap();
    assert_eq!(status.status, json!({"temp": 43}));

    let entries = db.log_entries(device.id).await.unwrap();
    assert_eq!(entries.len(), 2);
}
