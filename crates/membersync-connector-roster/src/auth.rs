//! Token authentication against the roster gateway.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

use membersync_connector::error::{ConnectorError, ConnectorResult};

/// Longest token lifetime honoured, whatever the gateway claims.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

#[derive(Serialize)]
struct TokenRequest<'a> {
    api_id: &'a str,
    api_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Cached bearer token.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true if the token is expired or will expire within the grace period.
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Token cache for the roster gateway.
#[derive(Debug)]
pub struct TokenCache {
    token_url: Url,
    api_id: String,
    api_hash: SecretString,
    http_client: Client,
    cached_token: RwLock<Option<CachedToken>>,
    grace_period: Duration,
}

impl TokenCache {
    /// Creates a new token cache.
    pub fn new(
        token_url: Url,
        api_id: String,
        api_hash: SecretString,
        http_client: Client,
        grace_period: Duration,
    ) -> Self {
        Self {
            token_url,
            api_id,
            api_hash,
            http_client,
            cached_token: RwLock::new(None),
            grace_period,
        }
    }

    /// Gets a valid access token, refreshing if necessary.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> ConnectorResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(ref token) = *cache {
                if !token.is_expired(self.grace_period) {
                    debug!("Using cached roster token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Requesting roster token");
        let new_token = self.acquire_token().await?;

        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    /// Invalidates the cached token, forcing a refresh on next use.
    pub async fn invalidate(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
    }

    async fn acquire_token(&self) -> ConnectorResult<CachedToken> {
        let response = self
            .http_client
            .post(self.token_url.clone())
            .json(&TokenRequest {
                api_id: &self.api_id,
                api_hash: self.api_hash.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| ConnectorError::network_with_source("token request failed", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConnectorError::authentication(format!(
                "roster gateway rejected credentials (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::fetch(format!(
                "token request failed with HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ConnectorError::invalid_data(format!("Failed to parse token response: {e}"))
        })?;

        let lifetime = Duration::try_seconds(token.expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS))
            .unwrap_or_else(Duration::zero);
        let expires_at = Utc::now().checked_add_signed(lifetime).ok_or_else(|| {
            ConnectorError::invalid_data(format!(
                "token lifetime of {}s is out of range",
                token.expires_in
            ))
        })?;
        debug!(
            "Acquired roster token, expires at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }
}
