use crate::db::{Database, NewDevice};
use crate::registry::error::RegistrarError;
use crate::registry::registrar::{RegistrationRequest, RegistrationResponse, Registrar};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// In-process implementation of the registration collaborator, backed by
/// the relational store. The find-or-create is a single atomic upsert on
/// the serial, so concurrent registrations for a never-before-seen serial
/// resolve to one device row.
pub struct DeviceRegistry<D: Database> {
    database: Arc<D>,
}

impl<D: Database> DeviceRegistry<D> {
    pub fn new(database: Arc<D>) -> Self {
        DeviceRegistry { database }
    }
}

#[async_trait]
impl<D: Database> Registrar for DeviceRegistry<D> {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, RegistrarError> {
        if request.serial.is_empty() {
            return Err(RegistrarError::InvalidRequest(
                "serial must not be empty".to_string(),
            ));
        }

        let name = if request.device_name.is_empty() {
            request.serial.clone()
        } else {
            request.device_name.clone()
        };

        debug!(
            "Registering device: serial={}, name={}, type={}",
            request.serial, name, request.device_type
        );

        let device = self
            .database
            .find_or_create_device(NewDevice {
                name,
                serial_number: request.serial.clone(),
                device_type: request.device_type,
            })
            .await
            .map_err(|e| RegistrarError::RegistrationFailed(e.to_string()))?;

        if let Some(user_id) = request.user_id {
            self.database
                .link_user_device(user_id, device.id)
                .await
                .map_err(|e| RegistrarError::RegistrationFailed(e.to_string()))?;
        }

        info!(
            "Registered device id={} for serial {}",
            device.id, request.serial
        );
        Ok(RegistrationResponse {
            device_id: device.id,
        })
    }
}
