//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent caller-side validation failures.
/// They are raised before any configuration is read or any request is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("No updates specified. Provide at least one of --owner, --admin, --secret-phc, --expires-at")]
    NoUpdates,

    #[error("token id must not be empty")]
    EmptyTokenId,

    #[error("invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("unknown token field: {0} (expected one of owner, is-admin, secret-phc, expires-at)")]
    UnknownField(String),

    #[error("cannot parse date '{input}': expected RFC 3339, YYYY-MM-DD, epoch seconds or 'never'")]
    InvalidDate { input: String },
}

impl DomainError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
