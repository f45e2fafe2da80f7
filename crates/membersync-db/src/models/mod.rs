//! Database entity models for membersync-db.

pub mod account;

pub use account::{encode_mapped_ids, parse_mapped_ids, Account, AccountRow};
