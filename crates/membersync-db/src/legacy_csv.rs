//! Legacy `users.csv` interchange.
//!
//! Earlier deployments kept the mapping in a CSV file with the header
//! `ID,JellyfinUser,Enabled`, where `ID` holds whitespace-delimited member ids
//! and `Enabled` is `True`/`False`. This module reads and writes that layout so
//! an existing file can be imported into the store, and exported back for
//! hand editing.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use membersync_connector::ids::MemberId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::models::{encode_mapped_ids, parse_mapped_ids, Account};
use crate::store::MappingStore;

/// One row of the legacy file as it appears on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LegacyRecord {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "JellyfinUser")]
    jellyfin_user: String,
    #[serde(rename = "Enabled")]
    enabled: String,
}

/// A parsed legacy row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRow {
    /// Account name.
    pub name: String,
    /// Mapped member ids.
    pub mapped_ids: BTreeSet<MemberId>,
    /// Enabled flag as last recorded.
    pub enabled: bool,
}

/// Result of parsing a legacy file.
#[derive(Debug, Default)]
pub struct LegacyParseResult {
    /// Rows that parsed cleanly.
    pub rows: Vec<LegacyRow>,
    /// Per-line problems (line number, message). Header is line 1.
    pub errors: Vec<(usize, String)>,
}

/// Counts from applying an import to a store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows created in the store.
    pub inserted: usize,
    /// Existing rows whose mapped ids were replaced.
    pub updated: usize,
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a legacy CSV file, collecting errors instead of stopping at the first one.
pub fn read_legacy_csv<R: Read>(reader: R) -> StoreResult<LegacyParseResult> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut result = LegacyParseResult::default();

    for (idx, record) in rdr.deserialize::<LegacyRecord>().enumerate() {
        let line = idx + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                result.errors.push((line, e.to_string()));
                continue;
            }
        };

        let name = record.jellyfin_user.trim().to_string();
        if name.is_empty() {
            result.errors.push((line, "empty JellyfinUser".to_string()));
            continue;
        }

        let Some(enabled) = parse_flag(&record.enabled) else {
            result
                .errors
                .push((line, format!("invalid Enabled value '{}'", record.enabled)));
            continue;
        };

        result.rows.push(LegacyRow {
            name,
            mapped_ids: parse_mapped_ids(&record.id),
            enabled,
        });
    }

    Ok(result)
}

/// Write accounts in the legacy layout.
pub fn write_legacy_csv<W: Write>(writer: W, accounts: &[Account]) -> StoreResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for account in accounts {
        wtr.serialize(LegacyRecord {
            id: encode_mapped_ids(&account.mapped_ids),
            jellyfin_user: account.name.clone(),
            enabled: if account.enabled { "True" } else { "False" }.to_string(),
        })?;
    }

    wtr.flush()?;
    Ok(())
}

/// Apply parsed legacy rows to a store.
///
/// New names are inserted unmapped (with an empty directory id, resolved by
/// name on the next cycle) and then given their ids and enabled flag. Existing
/// rows only get their mapped ids replaced; their enabled flag stays whatever
/// the store last confirmed.
pub async fn import_legacy_rows(
    store: &dyn MappingStore,
    rows: &[LegacyRow],
) -> StoreResult<ImportSummary> {
    let mut summary = ImportSummary::default();

    for row in rows {
        let inserted = store.upsert_unmapped(&row.name, "", row.enabled).await?;
        store.set_mapped_ids(&row.name, &row.mapped_ids).await?;

        if inserted {
            summary.inserted += 1;
            info!(account = %row.name, ids = row.mapped_ids.len(), "Imported legacy account");
        } else {
            summary.updated += 1;
            info!(account = %row.name, ids = row.mapped_ids.len(), "Replaced mapped ids from legacy file");
        }

        if row.mapped_ids.is_empty() {
            warn!(account = %row.name, "Legacy row has no member ids, account stays unprovisioned");
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMappingStore;

    const LEGACY: &str = "ID,JellyfinUser,Enabled\n\
                          100 101,alice,True\n\
                          ,bob,True\n\
                          200,carol,false\n\
                          300,dave,maybe\n";

    #[test]
    fn test_read_legacy_csv() {
        let parsed = read_legacy_csv(LEGACY.as_bytes()).unwrap();
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].0, 5);

        let alice = &parsed.rows[0];
        assert_eq!(alice.name, "alice");
        assert_eq!(alice.mapped_ids.len(), 2);
        assert!(alice.enabled);

        let bob = &parsed.rows[1];
        assert!(bob.mapped_ids.is_empty());

        assert!(!parsed.rows[2].enabled);
    }

    #[test]
    fn test_write_legacy_csv() {
        let accounts = vec![
            Account::unmapped("alice", "jf-1", true).with_mapped_ids(["101", "100"]),
            Account::unmapped("bob", "jf-2", false),
        ];
        let mut out = Vec::new();
        write_legacy_csv(&mut out, &accounts).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "ID,JellyfinUser,Enabled\n100 101,alice,True\n,bob,False\n"
        );
    }

    #[tokio::test]
    async fn test_import_keeps_existing_enabled_flag() {
        let store = MemoryMappingStore::with_accounts([Account::unmapped("alice", "jf-1", false)]);
        let parsed = read_legacy_csv(LEGACY.as_bytes()).unwrap();

        let summary = import_legacy_rows(&store, &parsed.rows).await.unwrap();
        assert_eq!(summary, ImportSummary { inserted: 2, updated: 1 });

        let alice = store.get("alice").await.unwrap();
        assert!(!alice.enabled);
        assert_eq!(alice.directory_id, "jf-1");
        assert_eq!(alice.mapped_ids.len(), 2);

        let carol = store.get("carol").await.unwrap();
        assert!(!carol.enabled);
        assert_eq!(carol.directory_id, "");
    }
}
