//! Authorization server client over real HTTP.

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use device_flow_agent::{
    agent_config, DeviceAuthorizationClient, DeviceCodeParams, DeviceFlowMachine, FlowStatus,
    InMemoryStateStore, OAuth2Error, PollErrorKind, ProtocolError,
};

use super::{device_code_body, http_client, mock_config};

#[tokio::test]
async fn test_request_device_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/device/code"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("client_id=client-123"))
        .and(body_string_contains(
            "scope=openid+profile+email+offline_access",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_code_body(5)))
        .expect(1)
        .mount(&server)
        .await;

    let client = http_client(mock_config(&server));
    let response = client
        .request_device_code(DeviceCodeParams::default())
        .await
        .unwrap();

    assert_eq!(response.device_code, "dev-1");
    assert_eq!(response.user_code, "WDJB-MJHT");
    assert_eq!(response.polling_interval(), 5);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(!body.contains("audience"));
}

#[tokio::test]
async fn test_request_device_code_with_audience() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/device/code"))
        .and(body_string_contains("audience=https%3A%2F%2Fapi.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_code_body(5)))
        .expect(1)
        .mount(&server)
        .await;

    let config = agent_config()
        .issuer_domain(server.uri())
        .client_id("client-123")
        .audience("https://api.example.com")
        .build()
        .unwrap();

    http_client(config)
        .request_device_code(DeviceCodeParams::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_request_device_code_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/device/code"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized_client",
            "error_description": "Grant type not allowed for this client"
        })))
        .mount(&server)
        .await;

    let error = http_client(mock_config(&server))
        .request_device_code(DeviceCodeParams::default())
        .await
        .unwrap_err();

    match error {
        OAuth2Error::Upstream(e) => {
            assert_eq!(e.status, 401);
            assert_eq!(e.oauth_error().unwrap().error, "unauthorized_client");
        }
        other => panic!("Expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/device/code"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://elsewhere.example.com"),
        )
        .mount(&server)
        .await;

    let error = http_client(mock_config(&server))
        .request_device_code(DeviceCodeParams::default())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        OAuth2Error::Protocol(ProtocolError::UnexpectedRedirect { .. })
    ));
}

#[tokio::test]
async fn test_poll_token_outcomes() {
    let server = MockServer::start().await;

    for (status, body) in [
        (400, json!({"error": "authorization_pending"})),
        (400, json!({"error": "slow_down"})),
        (403, json!({"error": "access_denied", "error_description": "User refused"})),
        (400, json!({"error": "expired_token"})),
        (500, json!({"message": "internal"})),
    ] {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code",
            ))
            .and(body_string_contains("device_code=dev-1"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }

    let client = http_client(mock_config(&server));
    let mut kinds = Vec::new();
    for _ in 0..5 {
        kinds.push(client.poll_token("dev-1").await.unwrap_err().kind);
    }

    assert_eq!(
        kinds,
        vec![
            PollErrorKind::Pending,
            PollErrorKind::SlowDown,
            PollErrorKind::Denied,
            PollErrorKind::Expired,
            PollErrorKind::Other,
        ]
    );
}

#[tokio::test]
async fn test_poll_token_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc",
            "id_token": "header.payload.sig",
            "refresh_token": "refresh-1",
            "expires_in": 86400,
            "token_type": "Bearer",
            "scope": "openid offline_access"
        })))
        .mount(&server)
        .await;

    let token = http_client(mock_config(&server))
        .poll_token("dev-1")
        .await
        .unwrap();

    assert_eq!(token.access_token, "abc");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(token.expires_in, Some(json!(86400)));
}

#[tokio::test]
async fn test_poll_token_unreachable_server_is_transient() {
    let config = {
        let server = MockServer::start().await;
        mock_config(&server)
    };

    let error = http_client(config).poll_token("dev-1").await.unwrap_err();
    assert_eq!(error.kind, PollErrorKind::Network);
    assert!(error.kind.should_continue_polling());
}

#[tokio::test]
async fn test_revoke_and_userinfo() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/revoke"))
        .and(body_string_contains("token=refresh-1"))
        .and(body_string_contains("client_id=client-123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "auth0|123",
            "email": "user@example.com"
        })))
        .mount(&server)
        .await;

    let client = http_client(mock_config(&server));
    client.revoke_token("refresh-1").await.unwrap();

    let profile = client.fetch_userinfo("abc").await.unwrap();
    assert_eq!(profile["email"], "user@example.com");

    // Unknown token is rejected by the mock server
    assert!(client.fetch_userinfo("other").await.is_err());
}

#[tokio::test]
async fn test_machine_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/device/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_code_body(5)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "slow_down"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc",
            "refresh_token": "refresh-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/revoke"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(http_client(mock_config(&server)));
    let machine = DeviceFlowMachine::new(client, Arc::new(InMemoryStateStore::new()));

    machine.start(DeviceCodeParams::default()).await.unwrap();
    assert_eq!(machine.snapshot().await.unwrap().interval, Some(5));

    let snapshot = machine.check_once().await.unwrap();
    assert_eq!(snapshot.status, FlowStatus::Pending);
    assert_eq!(snapshot.interval, Some(10));

    let snapshot = machine.check_once().await.unwrap();
    assert_eq!(snapshot.status, FlowStatus::Authorized);
    assert_eq!(snapshot.token.unwrap().access_token, "abc");

    // Revocation fails upstream, logout still clears local state
    machine.logout().await.unwrap();
    let state = machine.state().await.unwrap();
    assert_eq!(state.status(), FlowStatus::Idle);
    assert!(state.device_code.is_none());
}
