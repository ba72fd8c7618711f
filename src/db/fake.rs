use crate::db::database::Database;
use crate::db::error::DatabaseError;
use crate::db::models::{Device, DeviceLogEntry, DeviceStatus, DeviceUpdate, NewDevice, UserDeviceStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
struct UserDeviceLink {
    user_id: i64,
    device_id: i64,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    devices: HashMap<String, Device>,
    statuses: HashMap<i64, DeviceStatus>,
    logs: Vec<DeviceLogEntry>,
    links: Vec<UserDeviceLink>,
    next_id: i64,
    fail_writes: bool,
}

/// A fake in-memory implementation of the Database trait for testing.
/// All mutations take the single write lock, so the same atomicity the
/// real store provides per statement holds here per call.
#[derive(Clone)]
pub struct FakeDatabase {
    state: Arc<RwLock<State>>,
}

#[allow(dead_code)]
impl FakeDatabase {
    /// Create a new empty FakeDatabase
    pub fn new() -> Self {
        FakeDatabase {
            state: Arc::new(RwLock::new(State {
                next_id: 1,
                ..Default::default()
            })),
        }
    }

    /// Seed a device row directly, bypassing registration
    pub fn fake_add_device(&self, device: Device) {
        let mut state = self.state.write().unwrap();
        state.next_id = state.next_id.max(device.id + 1);
        state.devices.insert(device.serial_number.clone(), device);
    }

    /// Number of device rows currently stored
    pub fn fake_device_count(&self) -> usize {
        self.state.read().unwrap().devices.len()
    }

    /// Make every subsequent write operation fail, simulating an
    /// unreachable store
    pub fn fake_fail_writes(&self, fail: bool) {
        self.state.write().unwrap().fail_writes = fail;
    }

    /// Number of status history entries across all devices
    pub fn fake_log_count(&self) -> usize {
        self.state.read().unwrap().logs.len()
    }
}

#[cfg(test)]
impl Default for FakeDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for FakeDatabase {
    async fn find_device_by_serial(&self, serial: &str) -> Result<Option<Device>, DatabaseError> {
        let state = self.state.read().unwrap();
        Ok(state.devices.get(serial).cloned())
    }

    async fn find_or_create_device(&self, device: NewDevice) -> Result<Device, DatabaseError> {
        let mut state = self.state.write().unwrap();
        if state.fail_writes {
            return Err(DatabaseError::QueryError(
                "simulated write failure".to_string(),
            ));
        }

        if let Some(existing) = state.devices.get(&device.serial_number) {
            return Ok(existing.clone());
        }

        let id = state.next_id;
        state.next_id += 1;
        let created = Device {
            id,
            name: device.name,
            serial_number: device.serial_number,
            device_type: device.device_type,
            is_active: true,
            created_at: Utc::now(),
        };
        state
            .devices
            .insert(created.serial_number.clone(), created.clone());
        Ok(created)
    }

    async fn record_status(
        &self,
        device_id: i64,
        payload: &serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut state = self.state.write().unwrap();
        if state.fail_writes {
            return Err(DatabaseError::QueryError(
                "simulated write failure".to_string(),
            ));
        }

        state.statuses.insert(
            device_id,
            DeviceStatus {
                device_id,
                status: payload.clone(),
                updated_at: recorded_at,
            },
        );
        state.logs.push(DeviceLogEntry {
            device_id,
            status: payload.clone(),
            timestamp: recorded_at,
        });
        Ok(())
    }

    async fn get_status(&self, device_id: i64) -> Result<Option<DeviceStatus>, DatabaseError> {
        let state = self.state.read().unwrap();
        Ok(state.statuses.get(&device_id).cloned())
    }

    async fn link_user_device(&self, user_id: i64, device_id: i64) -> Result<(), DatabaseError> {
        let mut state = self.state.write().unwrap();
        if state.fail_writes {
            return Err(DatabaseError::QueryError(
                "simulated write failure".to_string(),
            ));
        }

        let now = Utc::now();
        if let Some(link) = state
            .links
            .iter_mut()
            .find(|link| link.user_id == user_id && link.device_id == device_id)
        {
            link.updated_at = now;
        } else {
            state.links.push(UserDeviceLink {
                user_id,
                device_id,
                updated_at: now,
            });
        }
        Ok(())
    }

    async fn list_devices_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<UserDeviceStatus>, DatabaseError> {
        let state = self.state.read().unwrap();
        let mut result: Vec<UserDeviceStatus> = state
            .links
            .iter()
            .filter(|link| link.user_id == user_id)
            .map(|link| UserDeviceStatus {
                device_id: link.device_id,
                updated_at: link.updated_at.timestamp(),
                status: state
                    .statuses
                    .get(&link.device_id)
                    .map(|status| status.status.clone())
                    .unwrap_or_else(|| serde_json::json!({})),
            })
            .collect();
        result.sort_by_key(|row| row.device_id);
        Ok(result)
    }

    async fn update_device(
        &self,
        device_id: i64,
        update: DeviceUpdate,
    ) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().unwrap();
        if state.fail_writes {
            return Err(DatabaseError::QueryError(
                "simulated write failure".to_string(),
            ));
        }

        let Some(serial) = state
            .devices
            .iter()
            .find(|(_, device)| device.id == device_id)
            .map(|(serial, _)| serial.clone())
        else {
            return Ok(false);
        };

        let mut device = state.devices.remove(&serial).unwrap();
        if let Some(name) = update.name {
            device.name = name;
        }
        if let Some(serial_number) = update.serial_number {
            device.serial_number = serial_number;
        }
        if let Some(device_type) = update.device_type {
            device.device_type = device_type;
        }
        state
            .devices
            .insert(device.serial_number.clone(), device);
        Ok(true)
    }

    async fn deactivate_device(&self, device_id: i64) -> Result<(), DatabaseError> {
        let mut state = self.state.write().unwrap();
        if state.fail_writes {
            return Err(DatabaseError::QueryError(
                "simulated write failure".to_string(),
            ));
        }

        if let Some(device) = state
            .devices
            .values_mut()
            .find(|device| device.id == device_id)
        {
            device.is_active = false;
        }
        Ok(())
    }

    #[cfg(test)]
    async fn log_entries(&self, device_id: i64) -> Result<Vec<DeviceLogEntry>, DatabaseError> {
        let state = self.state.read().unwrap();
        Ok(state
            .logs
            .iter()
            .filter(|entry| entry.device_id == device_id)
            .cloned()
            .collect())
    }
}
