//! Infrastructure-level errors: transport and remote-service failures

use thiserror::Error;

/// Errors raised while talking to the remote token service.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("validation error (HTTP {status}): {message}")]
    RemoteValidation { status: u16, message: String },

    #[error("network error: {context}: {source}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response (HTTP {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },

    #[error("cannot build client: {message}")]
    Client { message: String },
}

impl InfraError {
    /// Transport-level failures only; remote verdicts are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, InfraError::Network { .. })
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
