//! Error types for the membersync binary.

use membersync_connector::error::ConnectorError;
use membersync_db::StoreError;
use membersync_provisioning::CycleError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for command execution.
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced to the operator.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connector setup failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Mapping store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cycle aborted ({}): {0}", .0.kind())]
    Cycle(#[from] CycleError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Connector(_) => 2,
            AppError::Cycle(_) => 3,
            AppError::Validation(_) => 4,
            AppError::Store(_) | AppError::Io(_) | AppError::Output(_) => 1,
        }
    }

    /// Print the error (and a hint, when there is one) to stderr.
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            AppError::Config(ConfigError::MissingVar(_)) => {
                Some("Set the variable in the environment or in a .env file.")
            }
            AppError::Cycle(CycleError::Authentication(_)) => {
                Some("Check ROSTER_API_ID and ROSTER_API_HASH.")
            }
            AppError::Store(err) if err.is_not_found() => {
                Some("Run 'membersync accounts' to list known account names.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            AppError::Config(ConfigError::MissingVar("JELLYFIN_URL".into())).exit_code(),
            2
        );
        assert_eq!(
            AppError::Connector(ConnectorError::invalid_configuration("bad url")).exit_code(),
            2
        );
        assert_eq!(
            AppError::Cycle(CycleError::DirectoryFetch(ConnectorError::fetch("down"))).exit_code(),
            3
        );
        assert_eq!(AppError::Validation("no ids".into()).exit_code(), 4);
        assert_eq!(AppError::Store(StoreError::not_found("alice")).exit_code(), 1);
    }

    #[test]
    fn test_cycle_error_message_names_kind() {
        let err = AppError::Cycle(CycleError::membership(ConnectorError::authentication(
            "bad hash",
        )));
        assert!(err.to_string().contains("(auth)"));
        assert!(err.suggestion().is_some());
    }
}
