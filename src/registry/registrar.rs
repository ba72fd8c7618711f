use crate::registry::error::RegistrarError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A device registration request. Serializes to the wire shape the
/// collaborator expects: `{"devicename", "serial", "type"}` plus an
/// optional `"userid"` owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    #[serde(rename = "devicename")]
    pub device_name: String,
    pub serial: String,
    #[serde(rename = "type")]
    pub device_type: i32,
    #[serde(rename = "userid", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    #[serde(rename = "deviceid")]
    pub device_id: i64,
}

/// Registrar trait defining the registration collaborator as consumed by
/// the ingestion workflow: request in, response or failure out.
///
/// Implementations must be idempotent per serial — invoking registration
/// more than once for the same serial may never create duplicate device
/// rows, since the caller's lookup-then-register sequence is inherently
/// racy.
#[async_trait]
pub trait Registrar: Send + Sync + 'static {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, RegistrarError>;
}

/// Implementation of Registrar trait for Arc<T> where T implements
/// Registrar, so handlers can share one collaborator instance.
#[async_trait]
impl<T: Registrar + ?Sized> Registrar for Arc<T> {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, RegistrarError> {
        (**self).register(request).await
    }
}
