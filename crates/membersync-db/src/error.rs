//! Error types for the membersync-db crate.

use thiserror::Error;

/// Mapping store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached at all.
    ///
    /// While this persists no mutation can be recorded as applied.
    #[error("Mapping store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// No row for the given account name.
    #[error("Account not found in mapping store: {name}")]
    NotFound { name: String },

    /// Invalid connection string or row contents.
    #[error("Invalid store data: {0}")]
    Invalid(String),

    /// Legacy CSV could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Check if this error means the store as a whole is unreachable.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Check if this error is a missing row.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err),
            other => StoreError::QueryFailed(other),
        }
    }
}

/// Result type for mapping store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_unavailable());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_unavailable());
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("alice");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Account not found in mapping store: alice");
    }
}
