//! Jellyfin connector configuration.

use membersync_connector::error::{ConnectorError, ConnectorResult};
use secrecy::SecretString;
use url::Url;

/// Connection settings for a Jellyfin server.
#[derive(Clone)]
pub struct JellyfinConfig {
    /// Server base URL, e.g. `https://media.example.org` or `http://jf:8096/jellyfin`.
    pub base_url: String,
    /// API key sent as `X-Emby-Token`.
    pub api_key: SecretString,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for JellyfinConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JellyfinConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl JellyfinConfig {
    /// Create a configuration with default timeouts (30s request, 10s connect).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: SecretString::new(api_key.into()),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Check the configuration and return the parsed base URL.
    pub fn validate(&self) -> ConnectorResult<Url> {
        use secrecy::ExposeSecret;

        let url = Url::parse(&self.base_url).map_err(|e| {
            ConnectorError::invalid_configuration(format!(
                "invalid Jellyfin URL '{}': {e}",
                self.base_url
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConnectorError::invalid_configuration(format!(
                "unsupported Jellyfin URL scheme: {}",
                url.scheme()
            )));
        }

        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "Jellyfin API key is empty",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConnectorError::invalid_configuration(
                "Jellyfin timeout must be at least one second",
            ));
        }

        Ok(url)
    }
}
