//! Roster gateway membership source.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use membersync_connector::error::{ConnectorError, ConnectorResult};
use membersync_connector::traits::MembershipSource;
use membersync_connector::types::Member;

use crate::auth::TokenCache;
use crate::config::RosterConfig;

/// Member ids arrive as JSON numbers from some gateways and strings from others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn normalize(self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MemberDto {
    id: RawId,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MembersPage {
    members: Vec<MemberDto>,
    #[serde(default)]
    next_cursor: Option<String>,
}

enum PageOutcome {
    Page(MembersPage),
    Unauthorized,
}

/// Membership source backed by a roster gateway's REST API.
pub struct RosterSource {
    config: RosterConfig,
    members_url: Url,
    display_name: String,
    client: Client,
    tokens: TokenCache,
}

impl std::fmt::Debug for RosterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterSource")
            .field("config", &self.config)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl RosterSource {
    /// Create a new roster source.
    pub fn new(config: RosterConfig) -> ConnectorResult<Self> {
        let base_url = config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        let token_url = join(&base_url, &["auth", "token"])?;
        let members_url = join(&base_url, &["groups", config.group_name(), "members"])?;
        let display_name = format!("Roster: {}", config.group_name());

        let tokens = TokenCache::new(
            token_url,
            config.api_id.clone(),
            config.api_hash.clone(),
            client.clone(),
            chrono::Duration::seconds(config.token_grace_secs),
        );

        Ok(Self {
            config,
            members_url,
            display_name,
            client,
            tokens,
        })
    }

    async fn fetch_page(&self, token: &str, cursor: Option<&str>) -> ConnectorResult<PageOutcome> {
        let mut url = self.members_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.config.page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConnectorError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    ConnectorError::network_with_source("member listing request failed", e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(PageOutcome::Unauthorized);
        }
        if status == StatusCode::FORBIDDEN {
            return Err(ConnectorError::authentication(format!(
                "not allowed to list members of {}",
                self.config.group_name()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::fetch(format!(
                "member listing failed with HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let page = response
            .json()
            .await
            .map_err(|e| ConnectorError::fetch_with_source("Failed to parse member page", e))?;
        Ok(PageOutcome::Page(page))
    }
}

fn join(base: &Url, segments: &[&str]) -> ConnectorResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ConnectorError::invalid_configuration("roster URL cannot be a base"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl MembershipSource for RosterSource {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn authenticate(&self) -> ConnectorResult<()> {
        self.tokens.get_token().await.map(|_| ())
    }

    /// Walks every page; a failure on any page fails the whole listing so
    /// a truncated member list is never returned. A cursor seen twice, or
    /// more than `max_pages` pages, also fails the listing.
    #[instrument(skip(self), fields(group = %self.config.group_name()))]
    async fn list_members(&self) -> ConnectorResult<Vec<Member>> {
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors: HashSet<String> = HashSet::new();
        let mut pages: u32 = 0;
        let mut refreshed = false;

        loop {
            let token = self.tokens.get_token().await?;
            let page = match self.fetch_page(&token, cursor.as_deref()).await? {
                PageOutcome::Page(page) => page,
                PageOutcome::Unauthorized if !refreshed => {
                    debug!("Roster token rejected, refreshing");
                    self.tokens.invalidate().await;
                    refreshed = true;
                    continue;
                }
                PageOutcome::Unauthorized => {
                    return Err(ConnectorError::authentication(
                        "roster gateway rejected a freshly issued token",
                    ));
                }
            };

            pages += 1;
            for dto in page.members {
                let id = dto.id.normalize();
                if id.is_empty() {
                    warn!("Skipping roster member with empty id");
                    continue;
                }
                members.push(Member::new(id, dto.display_name.unwrap_or_default(), dto.username));
            }

            let Some(next) = page.next_cursor.filter(|c| !c.is_empty()) else {
                break;
            };
            if !seen_cursors.insert(next.clone()) {
                return Err(ConnectorError::fetch(format!(
                    "roster pagination did not advance: cursor '{next}' was already visited"
                )));
            }
            if pages >= self.config.max_pages {
                return Err(ConnectorError::fetch(format!(
                    "roster listing exceeded {} pages",
                    self.config.max_pages
                )));
            }
            cursor = Some(next);
        }

        debug!(count = members.len(), "Fetched roster members");
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_id_normalization() {
        let ids: Vec<RawId> = serde_json::from_str(r#"[123, " 456 ", -1001]"#).unwrap();
        let ids: Vec<String> = ids.into_iter().map(RawId::normalize).collect();
        assert_eq!(ids, vec!["123", "456", "-1001"]);
    }

    #[test]
    fn test_urls() {
        let source =
            RosterSource::new(RosterConfig::new("https://roster.local/api/", "1", "h", "@club"))
                .unwrap();
        assert_eq!(
            source.members_url.as_str(),
            "https://roster.local/api/groups/club/members"
        );
        assert_eq!(source.display_name(), "Roster: club");
    }
}
