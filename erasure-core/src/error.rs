// erasure-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::{ConnectorError, InfrastructureError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErasureError {
    // --- DOMAIN ERRORS (parameters, object names, unsafe updates) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (drivers, HTTP, credentials, config) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

// Shortcuts so adapters can use `?` directly on connector failures.
impl From<ConnectorError> for ErasureError {
    fn from(err: ConnectorError) -> Self {
        ErasureError::Infrastructure(InfrastructureError::Connector(err))
    }
}

impl From<std::io::Error> for ErasureError {
    fn from(err: std::io::Error) -> Self {
        ErasureError::Infrastructure(InfrastructureError::Io(err))
    }
}
