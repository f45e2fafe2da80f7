//! Account model.
//!
//! One row per directory account, keyed by account name. The set of mapped
//! member ids is stored as whitespace-delimited text and re-parsed on load.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use membersync_connector::ids::MemberId;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// An account and the member ids that represent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account name (primary key, case-sensitive).
    pub name: String,
    /// Directory-side identifier last seen for this account.
    pub directory_id: String,
    /// Member ids mapped to this account. Empty means unprovisioned.
    pub mapped_ids: BTreeSet<MemberId>,
    /// Last enabled state the engine considers authoritative.
    pub enabled: bool,
    /// The directory was changed but the store write was not confirmed.
    pub state_indeterminate: bool,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A freshly discovered account with no mapped ids.
    pub fn unmapped(name: impl Into<String>, directory_id: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            directory_id: directory_id.into(),
            mapped_ids: BTreeSet::new(),
            enabled,
            state_indeterminate: false,
            updated_at: Utc::now(),
        }
    }

    /// Builder-style helper to attach mapped ids.
    #[must_use]
    pub fn with_mapped_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MemberId>,
    {
        self.mapped_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Whether an operator has mapped at least one member id.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        !self.mapped_ids.is_empty()
    }
}

/// Encode a set of member ids for storage.
///
/// The set is already sorted and unique, so the encoding is canonical.
#[must_use]
pub fn encode_mapped_ids(ids: &BTreeSet<MemberId>) -> String {
    ids.iter()
        .map(MemberId::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse stored member ids. Any run of whitespace separates ids.
#[must_use]
pub fn parse_mapped_ids(raw: &str) -> BTreeSet<MemberId> {
    raw.split_whitespace().map(MemberId::from).collect()
}

/// Database row for the `accounts` table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    /// Account name (primary key).
    pub name: String,
    /// Directory-side identifier; empty until resolved by name.
    pub directory_id: String,
    /// Whitespace-delimited member ids.
    pub mapped_ids: String,
    /// Last confirmed enabled state.
    pub enabled: bool,
    /// Set when a directory change was not recorded.
    pub state_indeterminate: bool,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            name: row.name,
            directory_id: row.directory_id,
            mapped_ids: parse_mapped_ids(&row.mapped_ids),
            enabled: row.enabled,
            state_indeterminate: row.state_indeterminate,
            updated_at: row.updated_at,
        }
    }
}

impl AccountRow {
    /// List all rows ordered by name.
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Self>(
            r"
            SELECT name, directory_id, mapped_ids, enabled, state_indeterminate, updated_at
            FROM accounts
            ORDER BY name
            ",
        )
        .fetch_all(executor)
        .await
    }

    /// Insert an unmapped row unless the name already exists.
    ///
    /// Returns true when a row was inserted.
    pub async fn insert_unmapped<'e, E>(
        executor: E,
        name: &str,
        directory_id: &str,
        enabled: bool,
    ) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            INSERT INTO accounts (name, directory_id, mapped_ids, enabled, state_indeterminate, updated_at)
            VALUES (?1, ?2, '', ?3, 0, ?4)
            ON CONFLICT(name) DO NOTHING
            ",
        )
        .bind(name)
        .bind(directory_id)
        .bind(enabled)
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a confirmed enabled state and clear the indeterminate marker.
    ///
    /// Returns false when no row matched.
    pub async fn update_enabled<'e, E>(
        executor: E,
        name: &str,
        enabled: bool,
    ) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE accounts
            SET enabled = ?2, state_indeterminate = 0, updated_at = ?3
            WHERE name = ?1
            ",
        )
        .bind(name)
        .bind(enabled)
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flag a row whose directory state may differ from the stored one.
    pub async fn update_indeterminate<'e, E>(executor: E, name: &str) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE accounts
            SET state_indeterminate = 1, updated_at = ?2
            WHERE name = ?1
            ",
        )
        .bind(name)
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the mapped ids of a row.
    pub async fn update_mapped_ids<'e, E>(
        executor: E,
        name: &str,
        mapped_ids: &BTreeSet<MemberId>,
    ) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE accounts
            SET mapped_ids = ?2, updated_at = ?3
            WHERE name = ?1
            ",
        )
        .bind(name)
        .bind(encode_mapped_ids(mapped_ids))
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapped_ids_splits_any_whitespace() {
        let ids = parse_mapped_ids("  100\t101\n 100  ");
        let ids: Vec<_> = ids.iter().map(MemberId::as_str).collect();
        assert_eq!(ids, vec!["100", "101"]);
    }

    #[test]
    fn test_parse_mapped_ids_empty() {
        assert!(parse_mapped_ids("").is_empty());
        assert!(parse_mapped_ids("   ").is_empty());
    }

    #[test]
    fn test_encode_is_canonical() {
        let ids = parse_mapped_ids("300 100 200");
        assert_eq!(encode_mapped_ids(&ids), "100 200 300");
        assert_eq!(parse_mapped_ids(&encode_mapped_ids(&ids)), ids);
    }

    #[test]
    fn test_unmapped_account_is_not_provisioned() {
        let account = Account::unmapped("bob", "jf-bob", true);
        assert!(!account.is_provisioned());
        assert!(!account.state_indeterminate);

        let account = account.with_mapped_ids(["100"]);
        assert!(account.is_provisioned());
    }
}
