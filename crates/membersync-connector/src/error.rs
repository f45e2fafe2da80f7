//! Connector error types
//!
//! Error definitions with transient/permanent classification. The cycle
//! driver decides per error kind whether a failure aborts the cycle
//! (authentication, enumeration) or only the current transition
//! (directory mutation).

use thiserror::Error;

/// Error that can occur during connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connector could not authenticate against the remote system.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// Enumerating members or accounts failed.
    #[error("fetch failed: {message}")]
    Fetch {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The directory rejected a mutation.
    #[error("directory rejected request{}: {detail}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Directory { status: Option<u16>, detail: String },

    /// The remote object does not exist.
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },

    /// Request timed out.
    #[error("request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Network error during communication.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The remote system returned data we could not interpret.
    #[error("invalid data: {message}")]
    InvalidData { message: String },
}

impl ConnectorError {
    /// Check if this error is transient and the next cycle may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ConnectorError::Fetch { .. }
            | ConnectorError::Timeout { .. }
            | ConnectorError::Network { .. } => true,
            ConnectorError::Directory { status, .. } => {
                matches!(status, Some(s) if *s >= 500 || *s == 429) || status.is_none()
            }
            _ => false,
        }
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Whether this is an authentication failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, ConnectorError::Authentication { .. })
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::Authentication { .. } => "AUTH_FAILED",
            ConnectorError::Fetch { .. } => "FETCH_FAILED",
            ConnectorError::Directory { .. } => "DIRECTORY_REJECTED",
            ConnectorError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            ConnectorError::Timeout { .. } => "TIMEOUT",
            ConnectorError::Network { .. } => "NETWORK_ERROR",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
        }
    }

    // Convenience constructors

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        ConnectorError::Authentication {
            message: message.into(),
        }
    }

    /// Create a fetch error.
    pub fn fetch(message: impl Into<String>) -> Self {
        ConnectorError::Fetch {
            message: message.into(),
            source: None,
        }
    }

    /// Create a fetch error with source.
    pub fn fetch_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Fetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a directory rejection.
    pub fn directory(status: Option<u16>, detail: impl Into<String>) -> Self {
        ConnectorError::Directory {
            status,
            detail: detail.into(),
        }
    }

    /// Create a network error with source.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        ConnectorError::InvalidData {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let transient_errors = vec![
            ConnectorError::fetch("test"),
            ConnectorError::Timeout { timeout_secs: 30 },
            ConnectorError::Network {
                message: "reset".to_string(),
                source: None,
            },
            ConnectorError::directory(Some(503), "unavailable"),
            ConnectorError::directory(Some(429), "slow down"),
            ConnectorError::directory(None, "no response"),
        ];

        for err in transient_errors {
            assert!(
                err.is_transient(),
                "Expected {} to be transient",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_permanent_errors() {
        let permanent_errors = vec![
            ConnectorError::authentication("bad hash"),
            ConnectorError::invalid_configuration("missing url"),
            ConnectorError::directory(Some(400), "bad policy"),
            ConnectorError::ObjectNotFound {
                identifier: "jf-1".to_string(),
            },
            ConnectorError::invalid_data("not json"),
        ];

        for err in permanent_errors {
            assert!(
                err.is_permanent(),
                "Expected {} to be permanent",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_directory_error_display() {
        let err = ConnectorError::directory(Some(400), "IsDisabled is required");
        assert_eq!(
            err.to_string(),
            "directory rejected request (HTTP 400): IsDisabled is required"
        );

        let err = ConnectorError::directory(None, "connection reset");
        assert_eq!(err.to_string(), "directory rejected request: connection reset");
    }

    #[test]
    fn test_is_auth() {
        assert!(ConnectorError::authentication("x").is_auth());
        assert!(!ConnectorError::fetch("x").is_auth());
    }
}
