//! Endpoint layer driven through the router.

use axum::http::StatusCode;
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use device_flow_agent::{
    router, AppState, DeviceCodeParams, DeviceFlowMachine, InMemoryStateStore,
    MockDeviceAuthorizationClient, NetworkError, OAuth2Error, PollErrorKind, PollingMode,
    TokenRecord,
};

use super::get;

fn app(mode: PollingMode) -> (Router, Arc<MockDeviceAuthorizationClient>) {
    let client = Arc::new(MockDeviceAuthorizationClient::new());
    let machine = Arc::new(DeviceFlowMachine::new(
        client.clone(),
        Arc::new(InMemoryStateStore::new()),
    ));
    let state = Arc::new(AppState::new(machine, mode));
    (router(state), client)
}

#[tokio::test]
async fn test_home_before_authorization() {
    let (app, _) = app(PollingMode::OnQuery);

    let response = get(&app, "/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Not authorized"));

    let response = get(&app, "/status").await;
    assert_eq!(response.json(), json!({"status": "idle"}));
}

#[tokio::test]
async fn test_authorize_then_poll_on_query() {
    let (app, client) = app(PollingMode::OnQuery);

    let response = get(&app, "/authorize").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("ABCD-EFGH"));
    assert!(response.body.contains("data:image/svg+xml;base64,"));
    assert!(response.body.contains("https://example.com/activate?user_code=ABCD-EFGH"));
    assert_eq!(
        client.get_device_code_history(),
        vec![DeviceCodeParams::default()]
    );

    let response = get(&app, "/status").await;
    assert_eq!(response.json(), json!({"status": "pending", "interval": 5}));
    assert_eq!(client.get_poll_count(), 1);

    // Asked again before the interval elapsed: no extra poll
    get(&app, "/status").await;
    assert_eq!(client.get_poll_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_scenario_over_http() {
    let (app, client) = app(PollingMode::OnQuery);
    get(&app, "/authorize").await;

    client.queue_poll_error(PollErrorKind::SlowDown);
    let response = get(&app, "/status").await;
    assert_eq!(response.json(), json!({"status": "pending", "interval": 10}));

    let mut token = TokenRecord::new("abc");
    token.refresh_token = Some("refresh-1".to_string());
    client.queue_token(token);

    tokio::time::advance(Duration::from_secs(10)).await;
    let response = get(&app, "/status").await;
    let body = response.json();
    assert_eq!(body["status"], "authorized");
    assert_eq!(body["token"]["access_token"], "abc");

    let response = get(&app, "/").await;
    assert!(response.body.contains("Authorized"));

    let response = get(&app, "/logout").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.headers["location"], "/");
    assert_eq!(client.get_revoke_history(), vec!["refresh-1".to_string()]);

    let response = get(&app, "/status").await;
    assert_eq!(response.json(), json!({"status": "idle"}));
}

#[tokio::test]
async fn test_authorize_failure() {
    let (app, client) = app(PollingMode::OnQuery);
    client.set_next_device_error(OAuth2Error::Network(NetworkError::ConnectionFailed {
        message: "connection refused".to_string(),
    }));

    let response = get(&app, "/authorize").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, "Error starting authorization");

    let response = get(&app, "/status").await;
    assert_eq!(response.json(), json!({"status": "idle"}));
    assert_eq!(client.get_poll_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_access_denied_is_sticky() {
    let (app, client) = app(PollingMode::OnQuery);
    get(&app, "/authorize").await;
    client.queue_poll_error(PollErrorKind::Denied);

    let response = get(&app, "/status").await;
    assert_eq!(
        response.json(),
        json!({"status": "error", "error": "access_denied"})
    );

    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(30)).await;
        let response = get(&app, "/status").await;
        assert_eq!(response.json()["status"], "error");
    }
    assert_eq!(client.get_poll_count(), 1);

    // A new start recovers
    get(&app, "/authorize").await;
    let response = get(&app, "/status").await;
    assert_eq!(response.json()["status"], "pending");
}

#[tokio::test]
async fn test_userinfo() {
    let (app, client) = app(PollingMode::OnQuery);

    let response = get(&app, "/userinfo").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({"error": "Not authorized"}));

    get(&app, "/authorize").await;
    client.queue_token(TokenRecord::new("abc"));
    get(&app, "/status").await;

    // Upstream rejects the token
    let response = get(&app, "/userinfo").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json(), json!({"error": "Error fetching user info"}));

    client.set_userinfo(json!({"sub": "auth0|123", "name": "Test User"}));
    let response = get(&app, "/userinfo").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["sub"], "auth0|123");
}

#[tokio::test]
async fn test_logout_without_flow() {
    let (app, client) = app(PollingMode::OnQuery);

    let response = get(&app, "/logout").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(client.get_revoke_history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_background_polling() {
    let (app, client) = app(PollingMode::Background);
    client
        .queue_poll_error(PollErrorKind::Pending)
        .queue_token(TokenRecord::new("abc"));

    get(&app, "/authorize").await;

    // Status queries do not poll in background mode
    let response = get(&app, "/status").await;
    assert_eq!(response.json()["status"], "pending");
    assert_eq!(client.get_poll_count(), 0);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(client.get_poll_count(), 2);

    let response = get(&app, "/status").await;
    assert_eq!(response.json()["status"], "authorized");
}

#[tokio::test(start_paused = true)]
async fn test_logout_cancels_background_polling() {
    let (app, client) = app(PollingMode::Background);

    get(&app, "/authorize").await;
    get(&app, "/logout").await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(client.get_poll_count(), 0);
}
