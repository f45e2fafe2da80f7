//! SQLite-backed mapping store.

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use membersync_connector::ids::MemberId;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, instrument};

use crate::error::{StoreError, StoreResult};
use crate::migrations::run_migrations;
use crate::models::{Account, AccountRow};
use crate::store::MappingStore;

/// Mapping store persisted in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteMappingStore {
    pool: SqlitePool,
}

impl SqliteMappingStore {
    /// Connect using a `sqlite://` URL and run pending migrations.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Invalid(format!("invalid database url '{url}': {e}")))?;
        Self::connect_with(options).await
    }

    /// Open (creating if needed) a database file and run pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new().filename(path.as_ref());
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> StoreResult<Self> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StoreError::Unavailable)?;

        let store = Self { pool };
        run_migrations(&store.pool).await?;
        Ok(store)
    }

    /// Close all connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MappingStore for SqliteMappingStore {
    #[instrument(skip(self))]
    async fn load(&self) -> StoreResult<Vec<Account>> {
        let rows = AccountRow::list(&self.pool).await?;
        debug!(count = rows.len(), "Loaded accounts from mapping store");
        Ok(rows.into_iter().map(Account::from).collect())
    }

    #[instrument(skip(self))]
    async fn upsert_unmapped(
        &self,
        name: &str,
        directory_id: &str,
        enabled: bool,
    ) -> StoreResult<bool> {
        Ok(AccountRow::insert_unmapped(&self.pool, name, directory_id, enabled).await?)
    }

    #[instrument(skip(self))]
    async fn set_enabled(&self, name: &str, enabled: bool) -> StoreResult<()> {
        if AccountRow::update_enabled(&self.pool, name, enabled).await? {
            Ok(())
        } else {
            Err(StoreError::not_found(name))
        }
    }

    #[instrument(skip(self))]
    async fn mark_indeterminate(&self, name: &str) -> StoreResult<()> {
        if AccountRow::update_indeterminate(&self.pool, name).await? {
            Ok(())
        } else {
            Err(StoreError::not_found(name))
        }
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn set_mapped_ids(&self, name: &str, ids: &BTreeSet<MemberId>) -> StoreResult<()> {
        if AccountRow::update_mapped_ids(&self.pool, name, ids).await? {
            Ok(())
        } else {
            Err(StoreError::not_found(name))
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::Unavailable)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, SqliteMappingStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteMappingStore::open(dir.path().join("accounts.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_upsert_unmapped_never_overwrites() {
        let (_dir, store) = temp_store().await;

        assert!(store.upsert_unmapped("alice", "jf-1", true).await.unwrap());
        let ids: BTreeSet<MemberId> = ["100".into()].into_iter().collect();
        store.set_mapped_ids("alice", &ids).await.unwrap();

        assert!(!store.upsert_unmapped("alice", "jf-other", false).await.unwrap());

        let accounts = store.load().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].directory_id, "jf-1");
        assert!(accounts[0].enabled);
        assert_eq!(accounts[0].mapped_ids, ids);
    }

    #[tokio::test]
    async fn test_set_enabled_missing_row() {
        let (_dir, store) = temp_store().await;
        let err = store.set_enabled("ghost", true).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_indeterminate_cleared_by_set_enabled() {
        let (_dir, store) = temp_store().await;
        store.upsert_unmapped("carol", "jf-3", false).await.unwrap();

        store.mark_indeterminate("carol").await.unwrap();
        assert!(store.load().await.unwrap()[0].state_indeterminate);

        store.set_enabled("carol", true).await.unwrap();
        let carol = &store.load().await.unwrap()[0];
        assert!(carol.enabled);
        assert!(!carol.state_indeterminate);
    }

    #[tokio::test]
    async fn test_load_is_ordered_and_case_sensitive() {
        let (_dir, store) = temp_store().await;
        store.upsert_unmapped("bob", "2", true).await.unwrap();
        store.upsert_unmapped("Bob", "3", true).await.unwrap();
        store.upsert_unmapped("alice", "1", true).await.unwrap();

        let names: Vec<_> = store
            .load()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Bob", "alice", "bob"]);
    }

    #[tokio::test]
    async fn test_ping() {
        let (_dir, store) = temp_store().await;
        store.ping().await.unwrap();
        store.close().await;
        assert!(store.ping().await.unwrap_err().is_unavailable());
    }
}
