//! # Jellyfin Connector
//!
//! [`AccountDirectory`](membersync_connector::traits::AccountDirectory)
//! implementation for the Jellyfin media server.
//!
//! Accounts are listed from `GET /Users`; an account is enabled when its
//! policy has `IsDisabled = false`. Enabling or disabling reads the user's
//! full policy and posts it back to `/Users/{id}/Policy` with only
//! `IsDisabled` changed.
//!
//! ## Example
//!
//! ```ignore
//! use membersync_connector_jellyfin::{JellyfinConfig, JellyfinDirectory};
//!
//! let directory = JellyfinDirectory::new(JellyfinConfig::new("http://jf:8096", api_key))?;
//! for account in directory.list_accounts().await? {
//!     println!("{} enabled={}", account.name, account.enabled);
//! }
//! ```

pub mod config;
pub mod connector;

pub use config::JellyfinConfig;
pub use connector::JellyfinDirectory;
