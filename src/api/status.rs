use crate::api::response::HandlerResponse;
use crate::archive::Archive;
use crate::db::Database;
use crate::ingest::StatusIngestor;
use serde_json::{json, Value};
use tracing::error;

/// Handle one status report event: `200 {"deviceid", "message"}` on
/// success, `400` for malformed input, `500` for downstream failures,
/// always the single `{"error"}` envelope on failure.
pub async fn update_status<D: Database, A: Archive>(
    ingestor: &StatusIngestor<D, A>,
    event: &Value,
) -> HandlerResponse {
    match ingestor.ingest(event).await {
        Ok(receipt) => HandlerResponse::ok(json!({
            "deviceid": receipt.device_id,
            "message": "Status updated",
        })),
        Err(e) => {
            error!("Status update failed: {}", e);
            HandlerResponse::error(e.status_code(), e)
        }
    }
}
