//! Integration tests for the roster connector using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use membersync_connector::error::ConnectorError;
use membersync_connector::traits::MembershipSource;
use membersync_connector_roster::{RosterConfig, RosterSource};

// =============================================================================
// Test Helpers
// =============================================================================

fn source(server: &MockServer) -> RosterSource {
    RosterSource::new(
        RosterConfig::new(server.uri(), "12345", "secret-hash", "@movie_club").with_page_size(2),
    )
    .unwrap()
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_json(json!({"api_id": "12345", "api_hash": "secret-hash"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": token, "expires_in": 3600})),
        )
        .mount(server)
        .await;
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_authenticate_caches_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1", "expires_in": 3600})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server);
    source.authenticate().await.unwrap();
    source.authenticate().await.unwrap();
}

#[tokio::test]
async fn test_authenticate_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = source(&server).authenticate().await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_short_lived_token_is_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1", "expires_in": 30})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let source = source(&server);
    source.authenticate().await.unwrap();
    source.authenticate().await.unwrap();
}

#[tokio::test]
async fn test_oversized_token_lifetime_is_capped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "t1", "expires_in": i64::MAX})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server);
    source.authenticate().await.unwrap();
    source.authenticate().await.unwrap();
}

#[tokio::test]
async fn test_negative_token_lifetime_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "t1", "expires_in": i64::MIN})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let source = source(&server);
    source.authenticate().await.unwrap();
    source.authenticate().await.unwrap();
}

// =============================================================================
// Member listing
// =============================================================================

#[tokio::test]
async fn test_list_members_paginates() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .and(query_param("cursor", "page-2"))
        .and(header("Authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [{"id": "300", "display_name": "Carol", "username": null}],
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .and(query_param("limit", "2"))
        .and(header("Authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [
                {"id": 100, "display_name": "Alice", "username": "alice"},
                {"id": "200", "display_name": "Bob"}
            ],
            "next_cursor": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let members = source(&server).list_members().await.unwrap();

    let ids: Vec<_> = members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["100", "200", "300"]);
    assert_eq!(members[0].profile.label(), "Alice (@alice)");
    assert_eq!(members[1].profile.handle, None);
}

#[tokio::test]
async fn test_list_members_reauthenticates_once() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [{"id": 1}],
            "next_cursor": null
        })))
        .mount(&server)
        .await;

    let members = source(&server).list_members().await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].profile.label(), "<unnamed>");
}

#[tokio::test]
async fn test_list_members_persistent_401_is_auth_error() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let err = source(&server).list_members().await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_failed_page_fails_listing() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .and(query_param("cursor", "page-2"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream flood wait"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [{"id": 1}, {"id": 2}],
            "next_cursor": "page-2"
        })))
        .mount(&server)
        .await;

    let err = source(&server).list_members().await.unwrap_err();
    assert!(matches!(err, ConnectorError::Fetch { .. }));
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn test_stuck_cursor_is_rejected() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [{"id": 1}],
            "next_cursor": "same"
        })))
        .mount(&server)
        .await;

    let err = source(&server).list_members().await.unwrap_err();
    assert!(err.to_string().contains("did not advance"));
}

#[tokio::test]
async fn test_cursor_cycle_is_rejected() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;

    for (from, to) in [("A", "B"), ("B", "A")] {
        Mock::given(method("GET"))
            .and(path("/groups/movie_club/members"))
            .and(query_param("cursor", from))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "members": [{"id": format!("id-{from}")}],
                "next_cursor": to
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [{"id": 1}],
            "next_cursor": "A"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = source(&server).list_members().await.unwrap_err();
    assert!(matches!(err, ConnectorError::Fetch { .. }));
    assert!(err.to_string().contains("already visited"));
}

#[tokio::test]
async fn test_page_cap_stops_endless_listing() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;

    for page in 1..=3 {
        Mock::given(method("GET"))
            .and(path("/groups/movie_club/members"))
            .and(query_param("cursor", format!("page-{page}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "members": [{"id": page}],
                "next_cursor": format!("page-{}", page + 1)
            })))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/groups/movie_club/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [{"id": 0}],
            "next_cursor": "page-1"
        })))
        .mount(&server)
        .await;

    let source = RosterSource::new(
        RosterConfig::new(server.uri(), "12345", "secret-hash", "@movie_club").with_max_pages(3),
    )
    .unwrap();

    let err = source.list_members().await.unwrap_err();
    assert!(err.to_string().contains("exceeded 3 pages"));
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}
