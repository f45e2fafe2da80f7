//! Jellyfin directory implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use membersync_connector::error::{ConnectorError, ConnectorResult};
use membersync_connector::traits::AccountDirectory;
use membersync_connector::types::DirectoryAccount;

use crate::config::JellyfinConfig;

const TOKEN_HEADER: &str = "X-Emby-Token";

/// Longest response body echoed into an error.
const MAX_DETAIL_LEN: usize = 512;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserDto {
    name: String,
    id: String,
    #[serde(default)]
    policy: PolicyDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyDto {
    #[serde(default)]
    is_disabled: bool,
}

impl From<UserDto> for DirectoryAccount {
    fn from(user: UserDto) -> Self {
        DirectoryAccount::new(user.name, user.id, !user.policy.is_disabled)
    }
}

/// Account directory backed by the Jellyfin user API.
pub struct JellyfinDirectory {
    config: JellyfinConfig,
    base_url: Url,
    display_name: String,
    client: Client,
}

impl std::fmt::Debug for JellyfinDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JellyfinDirectory")
            .field("config", &self.config)
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl JellyfinDirectory {
    /// Create a new directory client.
    pub fn new(config: JellyfinConfig) -> ConnectorResult<Self> {
        let base_url = config.validate()?;
        let display_name = format!("Jellyfin: {}", base_url.host_str().unwrap_or("unknown"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            base_url,
            display_name,
            client,
        })
    }

    /// `{base}/Users[/{id}[/Policy]]` with each segment percent-encoded.
    fn users_url(&self, segments: &[&str]) -> ConnectorResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ConnectorError::invalid_configuration("Jellyfin URL cannot be a base"))?
            .pop_if_empty()
            .push("Users")
            .extend(segments);
        Ok(url)
    }

    fn send_error(&self, err: reqwest::Error, what: &str) -> ConnectorError {
        if err.is_timeout() {
            ConnectorError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            ConnectorError::network_with_source(format!("{what}: request failed"), err)
        }
    }

    async fn body_detail(response: Response) -> String {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_DETAIL_LEN {
            let mut end = MAX_DETAIL_LEN;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        body
    }

    /// Read the full policy of a user.
    async fn fetch_policy(&self, directory_id: &str) -> ConnectorResult<Value> {
        let url = self.users_url(&[directory_id])?;
        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| self.send_error(e, "read user"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ConnectorError::ObjectNotFound {
                identifier: directory_id.to_string(),
            });
        }
        if !status.is_success() {
            let detail = Self::body_detail(response).await;
            return Err(ConnectorError::directory(Some(status.as_u16()), detail));
        }

        let mut user: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::invalid_data(format!("Failed to parse user: {e}")))?;

        match user.get_mut("Policy").map(Value::take) {
            Some(policy @ Value::Object(_)) => Ok(policy),
            _ => Err(ConnectorError::invalid_data(format!(
                "user {directory_id} has no policy object"
            ))),
        }
    }
}

#[async_trait]
impl AccountDirectory for JellyfinDirectory {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn list_accounts(&self) -> ConnectorResult<Vec<DirectoryAccount>> {
        let url = self.users_url(&[])?;
        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| self.send_error(e, "list users"))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConnectorError::authentication(format!(
                "Jellyfin rejected API key (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let detail = Self::body_detail(response).await;
            return Err(ConnectorError::fetch(format!(
                "listing users failed with HTTP {}: {detail}",
                status.as_u16()
            )));
        }

        let users: Vec<UserDto> = response
            .json()
            .await
            .map_err(|e| ConnectorError::fetch_with_source("Failed to parse user list", e))?;

        debug!(count = users.len(), "Fetched Jellyfin users");
        Ok(users.into_iter().map(DirectoryAccount::from).collect())
    }

    /// Posts the user's complete policy with only `IsDisabled` changed, so
    /// the server does not reset the other policy fields to defaults.
    #[instrument(skip(self))]
    async fn set_enabled(&self, directory_id: &str, enabled: bool) -> ConnectorResult<()> {
        let mut policy = self.fetch_policy(directory_id).await?;
        policy["IsDisabled"] = Value::Bool(!enabled);

        let url = self.users_url(&[directory_id, "Policy"])?;
        let response = self
            .client
            .post(url)
            .header(TOKEN_HEADER, self.config.api_key.expose_secret())
            .json(&policy)
            .send()
            .await
            .map_err(|e| self.send_error(e, "update policy"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = Self::body_detail(response).await;
            warn!(status = %status, directory_id, "Jellyfin rejected policy update");
            return Err(ConnectorError::directory(Some(status.as_u16()), detail));
        }

        debug!(directory_id, enabled, "Updated Jellyfin user policy");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(base: &str) -> JellyfinDirectory {
        JellyfinDirectory::new(JellyfinConfig::new(base, "key")).unwrap()
    }

    #[test]
    fn test_users_url_root() {
        let jf = directory("http://jf.local:8096");
        assert_eq!(
            jf.users_url(&[]).unwrap().as_str(),
            "http://jf.local:8096/Users"
        );
        assert_eq!(
            jf.users_url(&["abc", "Policy"]).unwrap().as_str(),
            "http://jf.local:8096/Users/abc/Policy"
        );
    }

    #[test]
    fn test_users_url_with_prefix_and_encoding() {
        let jf = directory("https://media.example.org/jellyfin/");
        assert_eq!(
            jf.users_url(&["a b"]).unwrap().as_str(),
            "https://media.example.org/jellyfin/Users/a%20b"
        );
    }

    #[test]
    fn test_user_dto_conversion() {
        let user: UserDto = serde_json::from_str(
            r#"{"Name":"alice","Id":"f00","Policy":{"IsDisabled":true,"IsAdministrator":false}}"#,
        )
        .unwrap();
        let account = DirectoryAccount::from(user);
        assert_eq!(account.name, "alice");
        assert_eq!(account.directory_id, "f00");
        assert!(!account.enabled);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(directory("http://jf.local").display_name(), "Jellyfin: jf.local");
    }
}
