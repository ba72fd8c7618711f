use crate::config::RegistrarConfig;
use crate::registry::error::RegistrarError;
use crate::registry::registrar::{RegistrationRequest, RegistrationResponse, Registrar};
use async_trait::async_trait;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::{config::Region, Client};
use serde_json::Value;
use tracing::{debug, info};

/// Production transport for the registration collaborator: a synchronous
/// invoke of a named serverless function. The function's reply is a
/// `{"statusCode", "body"}` envelope whose body carries the device id.
pub struct LambdaRegistrar {
    client: Client,
    function_name: String,
}

impl LambdaRegistrar {
    /// Create a new LambdaRegistrar instance from configuration
    pub async fn new(config: &RegistrarConfig) -> Result<Self, RegistrarError> {
        let mut config_loader = aws_config::from_env();
        if let Some(region) = &config.region {
            config_loader = config_loader.region(Region::new(region.clone()));
        }
        let aws_config = config_loader.load().await;
        let client = Client::new(&aws_config);

        info!(
            "Using remote registration collaborator: {}",
            config.function_name
        );

        Ok(Self {
            client,
            function_name: config.function_name.clone(),
        })
    }

    /// Unwrap the collaborator's response envelope. The body may be a JSON
    /// string or an inline object; a bare response without an envelope is
    /// accepted as the body itself.
    fn response_body(payload: &Value) -> Result<Value, RegistrarError> {
        match payload.get("body") {
            Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|e| {
                RegistrarError::BadResponse(format!("body is not valid JSON: {}", e))
            }),
            Some(other) => Ok(other.clone()),
            None => Ok(payload.clone()),
        }
    }
}

#[async_trait]
impl Registrar for LambdaRegistrar {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, RegistrarError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| RegistrarError::InvalidRequest(e.to_string()))?;

        debug!(
            "Invoking {} for serial {}",
            self.function_name, request.serial
        );

        let output = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| RegistrarError::InvocationError(e.to_string()))?;

        if let Some(function_error) = output.function_error() {
            return Err(RegistrarError::InvocationError(format!(
                "{} returned a function error: {}",
                self.function_name, function_error
            )));
        }

        let blob = output.payload().ok_or_else(|| {
            RegistrarError::BadResponse("collaborator returned no payload".to_string())
        })?;
        let response: Value = serde_json::from_slice(blob.as_ref())
            .map_err(|e| RegistrarError::BadResponse(e.to_string()))?;

        if let Some(status_code) = response.get("statusCode").and_then(Value::as_i64) {
            if status_code != 200 {
                return Err(RegistrarError::RegistrationFailed(format!(
                    "collaborator returned status {}",
                    status_code
                )));
            }
        }

        let body = Self::response_body(&response)?;
        let device_id = body
            .get("deviceid")
            .and_then(Value::as_i64)
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                RegistrarError::BadResponse(
                    "response did not contain a usable deviceid".to_string(),
                )
            })?;

        info!(
            "Collaborator registered serial {} as device id={}",
            request.serial, device_id
        );
        Ok(RegistrationResponse { device_id })
    }
}
