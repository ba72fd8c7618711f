use crate::api::response::HandlerResponse;
use crate::db::{Database, DeviceUpdate};
use crate::registry::{RegistrationRequest, Registrar};
use serde_json::{json, Value};
use tracing::error;

/// Resolve the request body: inline object, or JSON under a `body`
/// string key
fn request_body(event: &Value) -> Option<Value> {
    match event.get("body") {
        Some(Value::String(raw)) => serde_json::from_str(raw).ok(),
        Some(other) => Some(other.clone()),
        None => Some(event.clone()),
    }
    .filter(Value::is_object)
}

fn query_param(event: &Value, name: &str) -> Option<String> {
    event
        .get("queryStringParameters")
        .and_then(|params| params.get(name))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

/// Read an id that may arrive as a JSON number or a string
fn id_field(body: &Value, name: &str) -> Option<i64> {
    match body.get(name) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

/// Register a device (the collaborator surface itself):
/// `200 {"deviceid"}` whether the serial was new or already known.
pub async fn add_device<R: Registrar>(registrar: &R, event: &Value) -> HandlerResponse {
    let Some(body) = request_body(event) else {
        return HandlerResponse::error(400, "Request body is not a valid JSON document");
    };

    let Some(serial) = body.get("serial").and_then(Value::as_str) else {
        return HandlerResponse::error(400, "serial is required");
    };
    let Some(device_name) = body.get("devicename").and_then(Value::as_str) else {
        return HandlerResponse::error(400, "devicename is required");
    };
    let Some(device_type) = body.get("type").and_then(Value::as_i64) else {
        return HandlerResponse::error(400, "type is required");
    };

    let request = RegistrationRequest {
        device_name: device_name.to_string(),
        serial: serial.to_string(),
        device_type: device_type as i32,
        user_id: id_field(&body, "userid"),
    };

    match registrar.register(&request).await {
        Ok(response) => HandlerResponse::ok(json!({"deviceid": response.device_id})),
        Err(e) => {
            error!("Device registration failed: {}", e);
            HandlerResponse::error(500, e)
        }
    }
}

/// Fetch the latest status for a device:
/// `200 {"status"}`, `404` when the device has no status row.
pub async fn get_device_status<D: Database>(database: &D, event: &Value) -> HandlerResponse {
    let Some(device_id) = query_param(event, "deviceid").and_then(|id| id.parse::<i64>().ok())
    else {
        return HandlerResponse::error(400, "Missing 'deviceid' query parameter");
    };

    match database.get_status(device_id).await {
        Ok(Some(status)) => {
            let is_empty = status
                .status
                .as_object()
                .map(|document| document.is_empty())
                .unwrap_or(false);
            if is_empty {
                HandlerResponse::ok(json!({"message": "Status is empty", "status": {}}))
            } else {
                HandlerResponse::ok(json!({"status": status.status}))
            }
        }
        Ok(None) => HandlerResponse::with_status(
            404,
            json!({"message": "Device has no status row"}),
        ),
        Err(e) => {
            error!("Status fetch failed for device id={}: {}", device_id, e);
            HandlerResponse::error(500, e)
        }
    }
}

/// List a user's devices with their latest status:
/// `200 {"devices": [{deviceid, updated_at, status}]}`.
pub async fn list_devices<D: Database>(database: &D, event: &Value) -> HandlerResponse {
    let Some(user_id) = query_param(event, "userid").and_then(|id| id.parse::<i64>().ok())
    else {
        return HandlerResponse::error(400, "Missing 'userid' query parameter");
    };

    match database.list_devices_for_user(user_id).await {
        Ok(devices) => {
            let devices: Vec<Value> = devices
                .into_iter()
                .map(|device| {
                    json!({
                        "deviceid": device.device_id,
                        "updated_at": device.updated_at,
                        "status": device.status,
                    })
                })
                .collect();
            HandlerResponse::ok(json!({"devices": devices}))
        }
        Err(e) => {
            error!("Device listing failed for user {}: {}", user_id, e);
            HandlerResponse::error(500, e)
        }
    }
}

/// Update device attributes: `404` for an unknown id, `400` when no
/// updatable field was provided.
pub async fn update_device<D: Database>(database: &D, event: &Value) -> HandlerResponse {
    let Some(body) = request_body(event) else {
        return HandlerResponse::error(400, "Request body is not a valid JSON document");
    };
    let Some(device_id) = id_field(&body, "deviceid") else {
        return HandlerResponse::error(400, "deviceid is required");
    };

    let update = DeviceUpdate {
        name: body
            .get("device_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        serial_number: body
            .get("serial")
            .and_then(Value::as_str)
            .map(str::to_string),
        device_type: body.get("type").and_then(Value::as_i64).map(|t| t as i32),
    };
    if update.is_empty() {
        return HandlerResponse::error(400, "No valid fields to update");
    }

    match database.update_device(device_id, update).await {
        Ok(true) => HandlerResponse::ok(json!({"message": "Device updated successfully"})),
        Ok(false) => HandlerResponse::with_status(404, json!({"message": "Device not found"})),
        Err(e) => {
            error!("Device update failed for id={}: {}", device_id, e);
            HandlerResponse::error(500, e)
        }
    }
}

/// Soft-delete a device by marking it inactive
pub async fn delete_device<D: Database>(database: &D, event: &Value) -> HandlerResponse {
    let Some(body) = request_body(event) else {
        return HandlerResponse::error(400, "Request body is not a valid JSON document");
    };
    let Some(device_id) = id_field(&body, "deviceid") else {
        return HandlerResponse::error(400, "deviceid is required");
    };

    match database.deactivate_device(device_id).await {
        Ok(()) => HandlerResponse::ok(json!({
            "message": format!("Device {} marked as inactive", device_id)
        })),
        Err(e) => {
            error!("Device deactivation failed for id={}: {}", device_id, e);
            HandlerResponse::error(500, e)
        }
    }
}
