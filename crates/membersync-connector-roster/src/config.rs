//! Roster gateway configuration.

use membersync_connector::error::{ConnectorError, ConnectorResult};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Default members requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Default cap on pages fetched for one listing.
pub const DEFAULT_MAX_PAGES: u32 = 1_000;

/// Connection settings for a roster gateway.
#[derive(Clone)]
pub struct RosterConfig {
    /// Gateway base URL.
    pub base_url: String,
    /// Application id presented when requesting a token.
    pub api_id: String,
    /// Application secret presented when requesting a token.
    pub api_hash: SecretString,
    /// Group (channel) whose members are listed.
    pub group: String,
    /// Members requested per page.
    pub page_size: u32,
    /// Pages fetched before a listing is abandoned as runaway.
    pub max_pages: u32,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
    /// Refresh tokens this many seconds before they expire.
    pub token_grace_secs: i64,
}

impl std::fmt::Debug for RosterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterConfig")
            .field("base_url", &self.base_url)
            .field("api_id", &self.api_id)
            .field("api_hash", &"[REDACTED]")
            .field("group", &self.group)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl RosterConfig {
    /// Create a configuration with default paging and timeouts.
    pub fn new(
        base_url: impl Into<String>,
        api_id: impl Into<String>,
        api_hash: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_id: api_id.into(),
            api_hash: SecretString::new(api_hash.into()),
            group: group.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            token_grace_secs: 60,
        }
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the page cap.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Group name without a leading `@`, as used in URLs.
    #[must_use]
    pub fn group_name(&self) -> &str {
        self.group.trim().trim_start_matches('@')
    }

    /// Check the configuration and return the parsed base URL.
    pub fn validate(&self) -> ConnectorResult<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ConnectorError::invalid_configuration(format!(
                "invalid roster URL '{}': {e}",
                self.base_url
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConnectorError::invalid_configuration(format!(
                "unsupported roster URL scheme: {}",
                url.scheme()
            )));
        }
        if self.api_id.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration("roster api id is empty"));
        }
        if self.api_hash.expose_secret().trim().is_empty() {
            return Err(ConnectorError::invalid_configuration("roster api hash is empty"));
        }
        if self.group_name().is_empty() {
            return Err(ConnectorError::invalid_configuration("roster group is empty"));
        }
        if self.page_size == 0 {
            return Err(ConnectorError::invalid_configuration(
                "roster page size must be at least 1",
            ));
        }
        if self.max_pages == 0 {
            return Err(ConnectorError::invalid_configuration(
                "roster page cap must be at least 1",
            ));
        }

        Ok(url)
    }
}
