//! # Roster Connector
//!
//! [`MembershipSource`](membersync_connector::traits::MembershipSource)
//! that reads group membership from an HTTP roster gateway.
//!
//! The gateway fronts the chat network holding the group. It exchanges an
//! application id and hash for a short-lived bearer token
//! (`POST /auth/token`) and lists members page by page
//! (`GET /groups/{group}/members?limit=..&cursor=..`).
//!
//! ## Features
//!
//! - **Token caching**: tokens are reused until shortly before expiry
//! - **Single re-authentication**: a rejected token is refreshed once per listing
//! - **All-or-nothing listing**: a failed page fails the listing
//!
//! ## Example
//!
//! ```ignore
//! use membersync_connector_roster::{RosterConfig, RosterSource};
//!
//! let source = RosterSource::new(RosterConfig::new(url, api_id, api_hash, "@movie_club"))?;
//! source.authenticate().await?;
//! let members = source.list_members().await?;
//! ```

pub mod auth;
pub mod config;
pub mod connector;

pub use auth::TokenCache;
pub use config::{RosterConfig, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
pub use connector::RosterSource;
