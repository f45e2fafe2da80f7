//! # Mapping Store
//!
//! Persistence for the account ⇄ member-id mapping.
//!
//! The store holds one row per directory account with the member ids an
//! operator mapped to it and the last enabled state the engine confirmed.
//! It contains no business logic; the reconciliation engine decides, the
//! store remembers.
//!
//! ## Backends
//!
//! - [`SqliteMappingStore`] - durable store backed by SQLite (sqlx)
//! - [`MemoryMappingStore`] - in-process store for dry runs and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use membersync_db::{MappingStore, SqliteMappingStore};
//!
//! let store = SqliteMappingStore::connect("sqlite://membersync.db").await?;
//! store.upsert_unmapped("alice", "5f1c...", true).await?;
//! for account in store.load().await? {
//!     println!("{} -> {:?}", account.name, account.mapped_ids);
//! }
//! ```

pub mod error;
pub mod legacy_csv;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod sqlite;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use legacy_csv::{
    import_legacy_rows, read_legacy_csv, write_legacy_csv, ImportSummary, LegacyParseResult,
    LegacyRow,
};
pub use memory::MemoryMappingStore;
pub use migrations::run_migrations;
pub use models::{encode_mapped_ids, parse_mapped_ids, Account};
pub use sqlite::SqliteMappingStore;
pub use store::MappingStore;
