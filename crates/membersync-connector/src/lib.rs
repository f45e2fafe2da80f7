//! # Connector Framework
//!
//! Abstractions for the two external systems membersync talks to:
//!
//! - [`MembershipSource`] - a group (e.g. a chat channel) whose current
//!   members decide who may use an account
//! - [`AccountDirectory`] - the service holding the accounts and their
//!   enabled/disabled flag
//!
//! Concrete connectors live in their own crates
//! (`membersync-connector-roster`, `membersync-connector-jellyfin`); the
//! provisioning engine only ever sees these traits.
//!
//! ## Crate Organization
//!
//! - [`ids`] - Type-safe member identifier
//! - [`types`] - Records exchanged with connectors
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Connector capability traits

pub mod error;
pub mod ids;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```
/// use membersync_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::ids::MemberId;
    pub use crate::traits::{AccountDirectory, MembershipSource};
    pub use crate::types::{DirectoryAccount, Member, MemberProfile};
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let id = MemberId::new("100");
        let member = Member::new("100", "Alice", Some("alice".to_string()));
        assert_eq!(member.id, id);
        let account = DirectoryAccount::new("alice", "jf-1", true);
        assert!(account.enabled);
        let err = ConnectorError::fetch("boom");
        assert!(err.is_transient());
    }
}
