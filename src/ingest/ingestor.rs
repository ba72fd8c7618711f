use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::Archive;
use crate::db::Database;
use crate::ingest::error::IngestError;
use crate::ingest::request::StatusRequest;
use crate::registry::{RegistrationRequest, Registrar};

/// The outcome of one ingested status report
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReceipt {
    pub device_id: i64,
    pub archive_key: String,
    /// False when the blob write failed after the relational commit;
    /// the status is saved either way
    pub archived: bool,
}

/// Orchestrates the status ingestion workflow: resolve the device
/// (registering unknown serials through the collaborator), persist
/// latest-status plus a history entry in one transaction, then archive
/// the raw payload.
///
/// Stateless across invocations; every call is an independent unit the
/// hosting environment may run concurrently with any other.
pub struct StatusIngestor<D: Database, A: Archive> {
    database: Arc<D>,
    archive: Arc<A>,
    registrar: Arc<dyn Registrar>,
    default_device_type: i32,
}

impl<D: Database, A: Archive> StatusIngestor<D, A> {
    pub fn new(
        database: Arc<D>,
        archive: Arc<A>,
        registrar: Arc<dyn Registrar>,
        default_device_type: i32,
    ) -> Self {
        StatusIngestor {
            database,
            archive,
            registrar,
            default_device_type,
        }
    }

    /// Ingest one status report event
    pub async fn ingest(&self, event: &serde_json::Value) -> Result<IngestReceipt, IngestError> {
        let invocation_id = Uuid::new_v4();

        let request = StatusRequest::from_event(event)?;
        info!(
            "[{}] Ingesting status report for serial {}",
            invocation_id, request.serial
        );

        let raw_payload = serde_json::to_vec(&request.document)
            .map_err(|e| IngestError::BadRequest(e.to_string()))?;

        let device_id = match self
            .database
            .find_device_by_serial(&request.serial)
            .await?
        {
            Some(device) => {
                debug!(
                    "[{}] Found existing device id={} for serial {}",
                    invocation_id, device.id, request.serial
                );
                device.id
            }
            None => {
                info!(
                    "[{}] Unknown serial {}, invoking registration collaborator",
                    invocation_id, request.serial
                );
                let registration = RegistrationRequest {
                    device_name: request.display_name.clone(),
                    serial: request.serial.clone(),
                    device_type: request.device_type.unwrap_or(self.default_device_type),
                    user_id: None,
                };
                let response = self.registrar.register(&registration).await?;
                info!(
                    "[{}] Serial {} registered as device id={}",
                    invocation_id, request.serial, response.device_id
                );
                response.device_id
            }
        };

        let recorded_at = Utc::now();
        self.database
            .record_status(device_id, &request.document, recorded_at)
            .await?;

        // The relational row is committed; the archive write is a
        // best-effort history mirror and must not fail the request.
        let key = archive_key(&request.serial, recorded_at);
        let archived = match self
            .archive
            .put_object(&key, Bytes::from(raw_payload))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "[{}] Failed to archive payload under {}: {}",
                    invocation_id, key, e
                );
                false
            }
        };

        info!(
            "[{}] Status updated for device id={} (archived: {})",
            invocation_id, device_id, archived
        );
        Ok(IngestReceipt {
            device_id,
            archive_key: key,
            archived,
        })
    }
}

/// History-preserving archive key: one object per report, named by serial
/// and millisecond-resolution timestamp
fn archive_key(serial: &str, recorded_at: DateTime<Utc>) -> String {
    format!(
        "{}/{}.json",
        serial,
        recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
