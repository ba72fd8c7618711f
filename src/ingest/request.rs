use crate::ingest::error::IngestError;
use serde_json::Value;

/// A parsed status report: the resolved device identifier plus the full
/// request document, which is stored verbatim as the status payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRequest {
    pub serial: String,
    pub display_name: String,
    pub device_type: Option<i32>,
    pub document: Value,
}

impl StatusRequest {
    /// Resolve an incoming event into a status request.
    ///
    /// The status document is either the event itself or nested under a
    /// `body` key (a JSON string when the hosting boundary passes bodies
    /// through verbatim, an object otherwise). The device is identified
    /// by `serial`, falling back to the legacy `dn` field; `dn` doubles
    /// as the display name when present.
    pub fn from_event(event: &Value) -> Result<Self, IngestError> {
        let document = match event.get("body") {
            Some(Value::String(raw)) => serde_json::from_str(raw)
                .map_err(|e| IngestError::BadRequest(e.to_string()))?,
            Some(other) => other.clone(),
            None => event.clone(),
        };

        if !document.is_object() {
            return Err(IngestError::BadRequest(
                "expected a JSON object".to_string(),
            ));
        }

        let serial = document
            .get("serial")
            .and_then(Value::as_str)
            .or_else(|| document.get("dn").and_then(Value::as_str))
            .ok_or(IngestError::MissingIdentifier)?
            .to_string();
        if serial.is_empty() {
            return Err(IngestError::MissingIdentifier);
        }

        let display_name = document
            .get("dn")
            .and_then(Value::as_str)
            .unwrap_or(&serial)
            .to_string();

        let device_type = document
            .get("type")
            .and_then(Value::as_i64)
            .map(|device_type| device_type as i32);

        Ok(StatusRequest {
            serial,
            display_name,
            device_type,
            document,
        })
    }
}
