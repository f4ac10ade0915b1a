//! Error types for wander-client

use thiserror::Error;

use crate::criteria::FieldErrors;
use crate::gateway::GatewayError;

/// Client-level errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Criteria failed validation; no request was sent
    #[error("Invalid search criteria: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Common(#[from] wander_common::Error),
}

impl From<FieldErrors> for ClientError {
    fn from(errors: FieldErrors) -> Self {
        ClientError::Validation(errors)
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
