use thiserror::Error;

/// Errors that can occur when registering a device
#[derive(Error, Debug)]
pub enum RegistrarError {
    #[error("Invalid registration request: {0}")]
    InvalidRequest(String),

    #[error("Failed to invoke registration collaborator: {0}")]
    InvocationError(String),

    #[error("Unusable registration response: {0}")]
    BadResponse(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Other registration error: {0}")]
    Other(#[from] anyhow::Error),
}
