//! Cycle error types.

use membersync_connector::error::ConnectorError;
use membersync_db::StoreError;
use thiserror::Error;

/// Errors that abort a whole cycle before its mutation phase.
///
/// Failures of a single transition never surface here; they are recorded
/// in the [`CycleReport`](crate::reconciliation::CycleReport).
#[derive(Debug, Error)]
pub enum CycleError {
    /// Listing directory accounts failed.
    #[error("directory enumeration failed: {0}")]
    DirectoryFetch(#[source] ConnectorError),

    /// The membership source rejected our credentials.
    #[error("membership source authentication failed: {0}")]
    Authentication(#[source] ConnectorError),

    /// Listing group members failed.
    #[error("membership enumeration failed: {0}")]
    MembershipFetch(#[source] ConnectorError),

    /// The mapping store could not be read or was unavailable before mutations.
    #[error("mapping store error: {0}")]
    Store(#[from] StoreError),
}

impl CycleError {
    /// Wrap a membership-source error, keeping authentication failures apart.
    pub fn membership(err: ConnectorError) -> Self {
        if err.is_auth() {
            Self::Authentication(err)
        } else {
            Self::MembershipFetch(err)
        }
    }

    /// Short machine-readable kind for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DirectoryFetch(_) | Self::MembershipFetch(_) => "fetch",
            Self::Authentication(_) => "auth",
            Self::Store(_) => "store",
        }
    }

    /// Whether the next cycle can reasonably be expected to succeed without
    /// operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DirectoryFetch(e) | Self::MembershipFetch(e) => e.is_transient(),
            Self::Authentication(_) => false,
            Self::Store(e) => e.is_unavailable(),
        }
    }
}

/// Result type for cycle operations.
pub type CycleResult<T> = Result<T, CycleError>;
