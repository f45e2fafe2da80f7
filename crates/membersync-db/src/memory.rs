//! In-memory mapping store, used for dry runs and tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use membersync_connector::ids::MemberId;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::Account;
use crate::store::MappingStore;

/// Mapping store that keeps rows in a `BTreeMap` keyed by account name.
#[derive(Debug, Default)]
pub struct MemoryMappingStore {
    rows: RwLock<BTreeMap<String, Account>>,
}

impl MemoryMappingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with accounts.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let rows = accounts
            .into_iter()
            .map(|account| (account.name.clone(), account))
            .collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Fetch a single account by name.
    pub async fn get(&self, name: &str) -> Option<Account> {
        self.rows.read().await.get(name).cloned()
    }

    async fn update<F>(&self, name: &str, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Account),
    {
        let mut rows = self.rows.write().await;
        let account = rows.get_mut(name).ok_or_else(|| StoreError::not_found(name))?;
        apply(account);
        account.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn load(&self) -> StoreResult<Vec<Account>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn upsert_unmapped(
        &self,
        name: &str,
        directory_id: &str,
        enabled: bool,
    ) -> StoreResult<bool> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(name) {
            return Ok(false);
        }
        rows.insert(
            name.to_string(),
            Account::unmapped(name, directory_id, enabled),
        );
        Ok(true)
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> StoreResult<()> {
        self.update(name, |account| {
            account.enabled = enabled;
            account.state_indeterminate = false;
        })
        .await
    }

    async fn mark_indeterminate(&self, name: &str) -> StoreResult<()> {
        self.update(name, |account| account.state_indeterminate = true)
            .await
    }

    async fn set_mapped_ids(&self, name: &str, ids: &BTreeSet<MemberId>) -> StoreResult<()> {
        self.update(name, |account| account.mapped_ids = ids.clone())
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
