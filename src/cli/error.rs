//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Application(e) => match e {
                ApplicationError::Domain(_) => exitcode::DATAERR,
                ApplicationError::Config { .. } => exitcode::CONFIG,
                ApplicationError::OperationFailed { .. } => exitcode::IOERR,
                ApplicationError::Infra(infra) => match infra {
                    InfraError::Authentication { .. } => exitcode::NOPERM,
                    InfraError::NotFound { .. } => exitcode::NOINPUT,
                    InfraError::RemoteValidation { .. } => exitcode::DATAERR,
                    InfraError::Network { .. } => exitcode::UNAVAILABLE,
                    InfraError::UnexpectedResponse { .. } => exitcode::SOFTWARE,
                    InfraError::Client { .. } => exitcode::CONFIG,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use rstest::rstest;

    #[rstest]
    #[case(ApplicationError::config("no endpoint"), exitcode::CONFIG)]
    #[case(ApplicationError::Domain(DomainError::NoUpdates), exitcode::DATAERR)]
    #[case(
        ApplicationError::Infra(InfraError::Authentication { status: 401, message: "x".into() }),
        exitcode::NOPERM
    )]
    #[case(
        ApplicationError::Infra(InfraError::NotFound { resource: "token t1".into() }),
        exitcode::NOINPUT
    )]
    #[case(
        ApplicationError::Infra(InfraError::RemoteValidation { status: 422, message: "x".into() }),
        exitcode::DATAERR
    )]
    #[case(
        ApplicationError::Infra(InfraError::UnexpectedResponse { status: 500, message: "x".into() }),
        exitcode::SOFTWARE
    )]
    fn given_application_error_when_mapping_then_sysexits_code(
        #[case] error: ApplicationError,
        #[case] expected: i32,
    ) {
        assert_eq!(CliError::from(error).exit_code(), expected);
    }

    #[test]
    fn given_usage_error_when_mapping_then_usage_code() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), exitcode::USAGE);
        assert_eq!(CliError::InvalidArgs("x".into()).exit_code(), exitcode::USAGE);
    }

    #[test]
    fn given_no_updates_when_displayed_then_message_passes_through() {
        let err = CliError::from(ApplicationError::from(DomainError::NoUpdates));
        assert!(err.to_string().starts_with("No updates specified"));
    }
}
