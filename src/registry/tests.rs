use crate::db::{Database, FakeDatabase};
use crate::registry::{
    DeviceRegistry, FakeRegistrar, RegistrarError, RegistrationRequest, Registrar,
};
use std::sync::Arc;

fn kettle_request() -> RegistrationRequest {
    RegistrationRequest {
        device_name: "Kettle".to_string(),
        serial: "SN-100".to_string(),
        device_type: 0,
        user_id: None,
    }
}

#[tokio::test]
async fn test_registry_creates_device_once() {
    let db = Arc::new(FakeDatabase::new());
    let registry = DeviceRegistry::new(db.clone());

    let first = registry.register(&kettle_request()).await.unwrap();
    let second = registry.register(&kettle_request()).await.unwrap();

    assert_eq!(first.device_id, second.device_id);
    assert_eq!(db.fake_device_count(), 1);

    let device = db
        .find_device_by_serial("SN-100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(device.name, "Kettle");
}

#[tokio::test]
async fn test_registry_rejects_empty_serial() {
    let db = Arc::new(FakeDatabase::new());
    let registry = DeviceRegistry::new(db);

    let mut request = kettle_request();
    request.serial = String::new();

    let result = registry.register(&request).await;
    assert!(matches!(result, Err(RegistrarError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_registry_defaults_name_to_serial() {
    let db = Arc::new(FakeDatabase::new());
    let registry = DeviceRegistry::new(db.clone());

    let mut request = kettle_request();
    request.device_name = String::new();
    registry.register(&request).await.unwrap();

    let device = db
        .find_device_by_serial("SN-100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(device.name, "SN-100");
}

#[tokio::test]
async fn test_registry_links_owner_when_present() {
    let db = Arc::new(FakeDatabase::new());
    let registry = DeviceRegistry::new(db.clone());

    let mut request = kettle_request();
    request.user_id = Some(12);
    let response = registry.register(&request).await.unwrap();

    let devices = db.list_devices_for_user(12).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_id, response.device_id);
}

#[tokio::test]
async fn test_registry_surfaces_store_failures() {
    let db = Arc::new(FakeDatabase::new());
    db.fake_fail_writes(true);
    let registry = DeviceRegistry::new(db);

    let result = registry.register(&kettle_request()).await;
    assert!(matches!(
        result,
        Err(RegistrarError::RegistrationFailed(_))
    ));
}

#[tokio::test]
async fn test_concurrent_registration_single_device() {
    let db = Arc::new(FakeDatabase::new());
    let registry = Arc::new(DeviceRegistry::new(db.clone()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.register(&kettle_request()).await.unwrap().device_id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    assert_eq!(db.fake_device_count(), 1, "Exactly one device row expected");
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_fake_registrar_records_calls_and_scripts_ids() {
    let registrar = FakeRegistrar::new();
    registrar.fake_set_device_id("SN-100", 7).await;

    let response = registrar.register(&kettle_request()).await.unwrap();
    assert_eq!(response.device_id, 7);

    let calls = registrar.fake_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].device_name, "Kettle");
    assert_eq!(calls[0].serial, "SN-100");
}

#[tokio::test]
async fn test_fake_registrar_failure_injection() {
    let registrar = FakeRegistrar::new();
    registrar.fake_fail(true).await;

    let result = registrar.register(&kettle_request()).await;
    assert!(matches!(result, Err(RegistrarError::InvocationError(_))));
    assert!(registrar.fake_calls().await.is_empty());
}

#[test]
fn test_registration_request_wire_shape() {
    let request = RegistrationRequest {
        device_name: "Kettle".to_string(),
        serial: "SN-100".to_string(),
        device_type: 0,
        user_id: None,
    };

    let wire = serde_json::to_value(&request).unwrap();
    assert_eq!(
        wire,
        serde_json::json!({"devicename": "Kettle", "serial": "SN-100", "type": 0})
    );

    let with_owner = RegistrationRequest {
        user_id: Some(12),
        ..request
    };
    let wire = serde_json::to_value(&with_owner).unwrap();
    assert_eq!(wire.get("userid").unwrap(), 12);
}
