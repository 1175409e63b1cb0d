//! Integration tests
//!
//! The authorization server client against a WireMock server, and the endpoint layer
//! driven through the router without binding a socket.

mod client;
mod server;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::MockServer;

use device_flow_agent::{
    agent_config, AgentConfig, HttpDeviceAuthorizationClient, ReqwestHttpTransport,
};

/// Configuration pointing at the mock server.
pub fn mock_config(server: &MockServer) -> AgentConfig {
    agent_config()
        .issuer_domain(server.uri())
        .client_id("client-123")
        .build()
        .unwrap()
}

/// Real HTTP client against the mock server.
pub fn http_client(config: AgentConfig) -> HttpDeviceAuthorizationClient<ReqwestHttpTransport> {
    let transport = Arc::new(ReqwestHttpTransport::new().unwrap());
    HttpDeviceAuthorizationClient::new(config, transport)
}

pub fn device_code_body(interval: u64) -> Value {
    json!({
        "device_code": "dev-1",
        "user_code": "WDJB-MJHT",
        "verification_uri": "https://tenant.example.com/activate",
        "verification_uri_complete": "https://tenant.example.com/activate?user_code=WDJB-MJHT",
        "expires_in": 900,
        "interval": interval
    })
}

/// Response captured from the router.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Issue a GET against the router.
pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}
