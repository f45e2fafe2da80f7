//! The mapping store abstraction.

use std::collections::BTreeSet;

use async_trait::async_trait;
use membersync_connector::ids::MemberId;

use crate::error::StoreResult;
use crate::models::Account;

/// Persisted association between accounts and their member ids.
///
/// Pure data access: no business rules live here. Every mutation is durable
/// by the time it returns, and a single row write is never observed half
/// applied.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Load every account, ordered by name.
    async fn load(&self) -> StoreResult<Vec<Account>>;

    /// Insert an account with no mapped ids, unless `name` already exists.
    ///
    /// Never overwrites an existing row. Returns true when a row was inserted.
    async fn upsert_unmapped(&self, name: &str, directory_id: &str, enabled: bool)
        -> StoreResult<bool>;

    /// Record the confirmed enabled state of an account.
    ///
    /// Clears the indeterminate marker. Fails with `NotFound` if absent.
    async fn set_enabled(&self, name: &str, enabled: bool) -> StoreResult<()>;

    /// Flag an account whose directory state could not be confirmed.
    async fn mark_indeterminate(&self, name: &str) -> StoreResult<()>;

    /// Replace the member ids mapped to an account. Fails with `NotFound` if absent.
    async fn set_mapped_ids(&self, name: &str, ids: &BTreeSet<MemberId>) -> StoreResult<()>;

    /// Cheap availability probe.
    async fn ping(&self) -> StoreResult<()>;
}
