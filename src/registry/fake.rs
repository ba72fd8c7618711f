use crate::registry::error::RegistrarError;
use crate::registry::registrar::{RegistrationRequest, RegistrationResponse, Registrar};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A fake in-memory implementation of the Registrar trait for testing.
/// Records every invocation and hands out scripted or sequential ids.
#[derive(Clone)]
pub struct FakeRegistrar {
    devices: Arc<Mutex<HashMap<String, i64>>>,
    calls: Arc<Mutex<Vec<RegistrationRequest>>>,
    fail: Arc<Mutex<bool>>,
    next_id: Arc<Mutex<i64>>,
}

#[allow(dead_code)]
impl FakeRegistrar {
    /// Create a new FakeRegistrar that assigns sequential ids
    pub fn new() -> Self {
        FakeRegistrar {
            devices: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(false)),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Script the id returned for a specific serial
    pub async fn fake_set_device_id(&self, serial: &str, device_id: i64) {
        let mut devices = self.devices.lock().await;
        devices.insert(serial.to_string(), device_id);
    }

    /// Simulate a transport failure on every subsequent invocation
    pub async fn fake_fail(&self, fail: bool) {
        *self.fail.lock().await = fail;
    }

    /// All invocations recorded so far
    pub async fn fake_calls(&self) -> Vec<RegistrationRequest> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Registrar for FakeRegistrar {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, RegistrarError> {
        if *self.fail.lock().await {
            return Err(RegistrarError::InvocationError(
                "simulated transport error".to_string(),
            ));
        }

        self.calls.lock().await.push(request.clone());

        let mut devices = self.devices.lock().await;
        let device_id = match devices.get(&request.serial) {
            Some(id) => *id,
            None => {
                let mut next_id = self.next_id.lock().await;
                let id = *next_id;
                *next_id += 1;
                devices.insert(request.serial.clone(), id);
                id
            }
        };

        Ok(RegistrationResponse { device_id })
    }
}

#[cfg(test)]
impl Default for FakeRegistrar {
    fn default() -> Self {
        Self::new()
    }
}
