use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered device. `serial_number` is the natural key; `id` is
/// assigned by the store on first sighting and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub serial_number: String,
    pub device_type: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to register a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    pub name: String,
    pub serial_number: String,
    pub device_type: i32,
}

/// The latest reported status for a device. Exactly one row per device,
/// last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: i64,
    pub status: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// One immutable entry in the append-only status history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLogEntry {
    pub device_id: i64,
    pub status: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Updatable device attributes; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub serial_number: Option<String>,
    pub device_type: Option<i32>,
}

impl DeviceUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.serial_number.is_none() && self.device_type.is_none()
    }
}

/// A device owned by a user, joined with its latest status.
/// `updated_at` is the link's update time as epoch seconds, matching the
/// wire shape of the list-devices response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDeviceStatus {
    pub device_id: i64,
    pub updated_at: i64,
    pub status: serde_json::Value,
}
