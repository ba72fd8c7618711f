use crate::db::error::DatabaseError;
use crate::db::models::{Device, DeviceStatus, DeviceUpdate, NewDevice, UserDeviceStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Database trait defining the relational surface consumed by the handlers
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Look up a device by its serial number
    async fn find_device_by_serial(&self, serial: &str) -> Result<Option<Device>, DatabaseError>;

    /// Find a device by serial or create it if absent.
    ///
    /// Must be atomic with respect to concurrent callers for the same
    /// serial: exactly one device row may result, and every caller gets
    /// the same id back.
    async fn find_or_create_device(&self, device: NewDevice) -> Result<Device, DatabaseError>;

    /// Upsert the latest-status row for a device and append a history
    /// entry, committed as one unit. The status row is last-write-wins;
    /// the history entry is never mutated afterwards.
    async fn record_status(
        &self,
        device_id: i64,
        payload: &serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Fetch the latest-status row for a device, if one exists
    async fn get_status(&self, device_id: i64) -> Result<Option<DeviceStatus>, DatabaseError>;

    /// Associate a device with a user, refreshing the link's update time
    /// when it already exists
    async fn link_user_device(&self, user_id: i64, device_id: i64) -> Result<(), DatabaseError>;

    /// List a user's devices joined with their latest status
    async fn list_devices_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<UserDeviceStatus>, DatabaseError>;

    /// Update device attributes. Returns false when no device matched.
    async fn update_device(
        &self,
        device_id: i64,
        update: DeviceUpdate,
    ) -> Result<bool, DatabaseError>;

    /// Soft-delete a device by clearing its active flag
    async fn deactivate_device(&self, device_id: i64) -> Result<(), DatabaseError>;

    /// Read the history entries for a device, oldest first (test-only)
    #[cfg(test)]
    async fn log_entries(
        &self,
        device_id: i64,
    ) -> Result<Vec<crate::db::models::DeviceLogEntry>, DatabaseError>;
}

/// Implementation of Database trait for Arc<T> where T implements Database
///
/// This allows sharing database instances across threads and components
/// efficiently.
#[async_trait]
impl<T: Database + ?Sized> Database for Arc<T> {
    async fn find_device_by_serial(&self, serial: &str) -> Result<Option<Device>, DatabaseError> {
        (**self).find_device_by_serial(serial).await
    }

    async fn find_or_create_device(&self, device: NewDevice) -> Result<Device, DatabaseError> {
        (**self).find_or_create_device(device).await
    }

    async fn record_status(
        &self,
        device_id: i64,
        payload: &serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        (**self).record_status(device_id, payload, recorded_at).await
    }

    async fn get_status(&self, device_id: i64) -> Result<Option<DeviceStatus>, DatabaseError> {
        (**self).get_status(device_id).await
    }

    async fn link_user_device(&self, user_id: i64, device_id: i64) -> Result<(), DatabaseError> {
        (**self).link_user_device(user_id, device_id).await
    }

    async fn list_devices_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<UserDeviceStatus>, DatabaseError> {
        (**self).list_devices_for_user(user_id).await
    }

    async fn update_device(
        &self,
        device_id: i64,
        update: DeviceUpdate,
    ) -> Result<bool, DatabaseError> {
        (**self).update_device(device_id, update).await
    }

    async fn deactivate_device(&self, device_id: i64) -> Result<(), DatabaseError> {
        (**self).deactivate_device(device_id).await
    }

    #[cfg(test)]
    async fn log_entries(
        &self,
        device_id: i64,
    ) -> Result<Vec<crate::db::models::DeviceLogEntry>, DatabaseError> {
        (**self).log_entries(device_id).await
    }
}
