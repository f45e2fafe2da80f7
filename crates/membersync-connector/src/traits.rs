//! Connector traits
//!
//! Capability traits for the two sides of a sync. Implementations must apply
//! their own bounded timeouts; callers never wrap them.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::types::{DirectoryAccount, Member};

/// A group whose current membership decides which accounts are enabled.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Display name for this source instance, used in log lines.
    fn display_name(&self) -> &str;

    /// Establish (or refresh) credentials against the source.
    ///
    /// Returns [`ConnectorError::Authentication`] when the credentials are
    /// rejected.
    ///
    /// [`ConnectorError::Authentication`]: crate::error::ConnectorError::Authentication
    async fn authenticate(&self) -> ConnectorResult<()>;

    /// Enumerate every current member of the group.
    ///
    /// The returned list must be complete: a partial page is reported as
    /// [`ConnectorError::Fetch`], never as a shorter list.
    ///
    /// [`ConnectorError::Fetch`]: crate::error::ConnectorError::Fetch
    async fn list_members(&self) -> ConnectorResult<Vec<Member>>;
}

/// The service holding the accounts whose enabled flag is kept in sync.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Display name for this directory instance, used in log lines.
    fn display_name(&self) -> &str;

    /// List all accounts with their current enabled flag.
    async fn list_accounts(&self) -> ConnectorResult<Vec<DirectoryAccount>>;

    /// Set the enabled flag of one account.
    ///
    /// Must be idempotent: setting the flag it already has succeeds.
    async fn set_enabled(&self, directory_id: &str, enabled: bool) -> ConnectorResult<()>;
}
