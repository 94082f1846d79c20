use crate::types::Service;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Token rejected by the remote API")]
    Unauthorized,

    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("Invalid state parameter. Possible CSRF attack.")]
    CsrfMismatch,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("{0} authorization is not implemented")]
    ServiceNotImplemented(Service),

    #[error("An authorization operation is already in flight for {0}")]
    OperationInProgress(Service),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
