use crate::db::DatabaseError;
use crate::registry::RegistrarError;
use thiserror::Error;

/// Errors that can occur while ingesting a status report. Archival
/// failures are deliberately absent: the blob write is best-effort and
/// never fails the request.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Request body is not a valid JSON document: {0}")]
    BadRequest(String),

    #[error("Device identifier (serial or dn) not found in payload")]
    MissingIdentifier,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Device registration failed: {0}")]
    Registration(#[from] RegistrarError),
}

impl IngestError {
    /// HTTP-style status code this error maps to at the handler boundary:
    /// client errors are reported as 400, downstream failures as 500
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::BadRequest(_) | IngestError::MissingIdentifier => 400,
            IngestError::Database(_) | IngestError::Registration(_) => 500,
        }
    }
}
