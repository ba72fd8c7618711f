use serde_json::{json, Value};
use std::fmt::Display;

/// A JSON response with an HTTP-style status code, the shape every
/// handler in this service returns
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: Value,
}

impl HandlerResponse {
    pub fn ok(body: Value) -> Self {
        HandlerResponse {
            status_code: 200,
            body,
        }
    }

    pub fn with_status(status_code: u16, body: Value) -> Self {
        HandlerResponse { status_code, body }
    }

    /// The single error envelope all failures share
    pub fn error(status_code: u16, message: impl Display) -> Self {
        HandlerResponse {
            status_code,
            body: json!({"error": message.to_string()}),
        }
    }

    /// Render the hosting-boundary envelope: stringified body plus
    /// content-type header
    pub fn into_envelope(self) -> Value {
        json!({
            "statusCode": self.status_code,
            "body": self.body.to_string(),
            "headers": {"Content-Type": "application/json"},
        })
    }
}
