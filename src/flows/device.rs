//! Device Authorization Client
//!
//! RFC 8628 - OAuth 2.0 Device Authorization Grant, client side: device code
//! issuance, token polling, plus RFC 7009 revocation and the OIDC userinfo call.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{
    create_error_from_response, NetworkError, OAuth2Error, ProtocolError,
};
use crate::types::{
    AgentConfig, DeviceAuthorizationResponse, DeviceCodeParams, PollError, PollErrorKind,
    TokenRecord, DEVICE_CODE_GRANT_TYPE,
};

/// Authorization server client interface.
#[async_trait]
pub trait DeviceAuthorizationClient: Send + Sync {
    /// Request device and user codes.
    async fn request_device_code(
        &self,
        params: DeviceCodeParams,
    ) -> Result<DeviceAuthorizationResponse, OAuth2Error>;

    /// Poll the token endpoint once.
    async fn poll_token(&self, device_code: &str) -> Result<TokenRecord, PollError>;

    /// Revoke a refresh token.
    async fn revoke_token(&self, refresh_token: &str) -> Result<(), OAuth2Error>;

    /// Fetch the user profile with an access token.
    async fn fetch_userinfo(&self, access_token: &str) -> Result<serde_json::Value, OAuth2Error>;
}

/// HTTP implementation of the authorization server client.
pub struct HttpDeviceAuthorizationClient<T: HttpTransport> {
    config: AgentConfig,
    transport: Arc<T>,
}

impl<T: HttpTransport> HttpDeviceAuthorizationClient<T> {
    /// Create a new client.
    pub fn new(config: AgentConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    fn device_code_request(&self, params: &DeviceCodeParams) -> HttpRequest {
        let scope = params
            .scopes
            .as_ref()
            .map(|s| s.join(" "))
            .unwrap_or_else(|| self.config.scope_string());
        let audience = params
            .audience
            .as_deref()
            .filter(|a| !a.is_empty())
            .or(self.config.audience.as_deref())
            .filter(|a| !a.is_empty());

        let mut form = vec![("client_id", self.config.client_id.as_str())];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }
        if let Some(audience) = audience {
            form.push(("audience", audience));
        }

        HttpRequest::post_form(&self.config.provider.device_authorization_endpoint, &form)
            .with_timeout(self.config.timeout)
    }

    fn token_request(&self, device_code: &str) -> HttpRequest {
        HttpRequest::post_form(
            &self.config.provider.token_endpoint,
            &[
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
                ("device_code", device_code),
                ("client_id", self.config.client_id.as_str()),
            ],
        )
        .with_timeout(self.config.timeout)
    }

    fn revocation_request(&self, refresh_token: &str) -> HttpRequest {
        HttpRequest::post_form(
            &self.config.provider.revocation_endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("token", refresh_token),
            ],
        )
        .with_timeout(self.config.timeout)
    }
}

/// Classify a token endpoint response.
///
/// Any body carrying an `access_token` is a success whatever the status code; an
/// OAuth `error` code maps to its poll error kind; everything else is `Other`.
pub fn classify_poll_response(response: &HttpResponse) -> Result<TokenRecord, PollError> {
    let body: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();

    if let Some(body) = body {
        let error_code = body
            .get("error")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if let Some(token) = TokenRecord::from_response_body(body) {
            return Ok(token);
        }

        if let Some(code) = error_code {
            return Err(PollError::new(
                PollErrorKind::from_error_code(&code),
                response.body.clone(),
            ));
        }
    }

    let raw = if response.body.is_empty() {
        format!("HTTP {} without body", response.status)
    } else {
        response.body.clone()
    };
    Err(PollError::new(PollErrorKind::Other, raw))
}

fn parse_json<R: serde::de::DeserializeOwned>(body: &str) -> Result<R, OAuth2Error> {
    serde_json::from_str(body).map_err(|e| {
        OAuth2Error::Protocol(ProtocolError::InvalidJson {
            message: e.to_string(),
        })
    })
}

#[async_trait]
impl<T: HttpTransport> DeviceAuthorizationClient for HttpDeviceAuthorizationClient<T> {
    async fn request_device_code(
        &self,
        params: DeviceCodeParams,
    ) -> Result<DeviceAuthorizationResponse, OAuth2Error> {
        let request = self.device_code_request(&params);
        debug!(endpoint = %request.url, "Requesting device code");

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(create_error_from_response(response.status, &response.body));
        }

        let device_response: DeviceAuthorizationResponse = parse_json(&response.body)?;
        if device_response.device_code.is_empty() {
            return Err(OAuth2Error::Protocol(ProtocolError::InvalidResponse {
                message: "device_code missing from device authorization response".to_string(),
            }));
        }

        Ok(device_response)
    }

    async fn poll_token(&self, device_code: &str) -> Result<TokenRecord, PollError> {
        let request = self.token_request(device_code);

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(OAuth2Error::Network(e)) => {
                return Err(PollError::new(PollErrorKind::Network, e.to_string()));
            }
            Err(e) => return Err(PollError::new(PollErrorKind::Other, e.to_string())),
        };

        let result = classify_poll_response(&response);
        if let Err(e) = &result {
            debug!(status = response.status, kind = ?e.kind, "Token poll did not yield a token");
        }
        result
    }

    async fn revoke_token(&self, refresh_token: &str) -> Result<(), OAuth2Error> {
        let response = self
            .transport
            .send(self.revocation_request(refresh_token))
            .await?;

        // RFC 7009: 200 for a revoked token and for a token the server did not know
        if !response.is_success() {
            return Err(create_error_from_response(response.status, &response.body));
        }

        Ok(())
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<serde_json::Value, OAuth2Error> {
        let request = HttpRequest::get_with_bearer(
            &self.config.provider.userinfo_endpoint,
            access_token,
        )
        .with_timeout(self.config.timeout);

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "Userinfo request rejected");
            return Err(create_error_from_response(response.status, &response.body));
        }

        parse_json(&response.body)
    }
}

/// Mock authorization server client for testing.
///
/// Poll results are served in the order they were queued; an empty queue answers
/// `authorization_pending`.
#[derive(Default)]
pub struct MockDeviceAuthorizationClient {
    device_code_history: Mutex<Vec<DeviceCodeParams>>,
    poll_history: Mutex<Vec<String>>,
    revoke_history: Mutex<Vec<String>>,
    next_device_response: Mutex<Option<DeviceAuthorizationResponse>>,
    next_device_error: Mutex<Option<OAuth2Error>>,
    poll_results: Mutex<VecDeque<Result<TokenRecord, PollError>>>,
    revoke_should_fail: Mutex<bool>,
    userinfo: Mutex<Option<serde_json::Value>>,
    poll_latency: Mutex<Option<Duration>>,
    polls_in_flight: AtomicUsize,
    max_polls_in_flight: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockDeviceAuthorizationClient {
    /// Create new mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set next device code response.
    pub fn set_next_device_response(&self, response: DeviceAuthorizationResponse) -> &Self {
        *lock(&self.next_device_response) = Some(response);
        self
    }

    /// Make the next device code request fail.
    pub fn set_next_device_error(&self, error: OAuth2Error) -> &Self {
        *lock(&self.next_device_error) = Some(error);
        self
    }

    /// Queue a successful poll.
    pub fn queue_token(&self, token: TokenRecord) -> &Self {
        lock(&self.poll_results).push_back(Ok(token));
        self
    }

    /// Queue a failed poll.
    pub fn queue_poll_error(&self, kind: PollErrorKind) -> &Self {
        let code = match kind {
            PollErrorKind::Pending => "authorization_pending",
            PollErrorKind::SlowDown => "slow_down",
            PollErrorKind::Denied => "access_denied",
            PollErrorKind::Expired => "expired_token",
            PollErrorKind::Other => "invalid_grant",
            PollErrorKind::Network => {
                lock(&self.poll_results)
                    .push_back(Err(PollError::new(kind, "connection refused")));
                return self;
            }
        };
        let raw = serde_json::json!({ "error": code }).to_string();
        lock(&self.poll_results).push_back(Err(PollError::new(kind, raw)));
        self
    }

    /// Make revocation fail.
    pub fn set_revoke_should_fail(&self, should_fail: bool) -> &Self {
        *lock(&self.revoke_should_fail) = should_fail;
        self
    }

    /// Set the userinfo profile.
    pub fn set_userinfo(&self, profile: serde_json::Value) -> &Self {
        *lock(&self.userinfo) = Some(profile);
        self
    }

    /// Delay every poll.
    pub fn set_poll_latency(&self, latency: Duration) -> &Self {
        *lock(&self.poll_latency) = Some(latency);
        self
    }

    /// Get device code request history.
    pub fn get_device_code_history(&self) -> Vec<DeviceCodeParams> {
        lock(&self.device_code_history).clone()
    }

    /// Get poll history (device codes polled).
    pub fn get_poll_history(&self) -> Vec<String> {
        lock(&self.poll_history).clone()
    }

    /// Get poll count.
    pub fn get_poll_count(&self) -> usize {
        lock(&self.poll_history).len()
    }

    /// Get revoked tokens.
    pub fn get_revoke_history(&self) -> Vec<String> {
        lock(&self.revoke_history).clone()
    }

    /// Highest number of polls that were in flight at once.
    pub fn max_polls_in_flight(&self) -> usize {
        self.max_polls_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceAuthorizationClient for MockDeviceAuthorizationClient {
    async fn request_device_code(
        &self,
        params: DeviceCodeParams,
    ) -> Result<DeviceAuthorizationResponse, OAuth2Error> {
        lock(&self.device_code_history).push(params);

        if let Some(error) = lock(&self.next_device_error).take() {
            return Err(error);
        }

        if let Some(response) = lock(&self.next_device_response).take() {
            return Ok(response);
        }

        let issued = lock(&self.device_code_history).len();
        Ok(DeviceAuthorizationResponse {
            device_code: format!("mock-device-code-{}", issued),
            user_code: "ABCD-EFGH".to_string(),
            verification_uri: "https://example.com/activate".to_string(),
            verification_uri_complete: Some(
                "https://example.com/activate?user_code=ABCD-EFGH".to_string(),
            ),
            expires_in: Some(900),
            interval: Some(5),
        })
    }

    async fn poll_token(&self, device_code: &str) -> Result<TokenRecord, PollError> {
        let current = self.polls_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_polls_in_flight.fetch_max(current, Ordering::SeqCst);
        lock(&self.poll_history).push(device_code.to_string());

        let latency = *lock(&self.poll_latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let result = lock(&self.poll_results).pop_front();
        self.polls_in_flight.fetch_sub(1, Ordering::SeqCst);

        result.unwrap_or_else(|| {
            Err(PollError::new(
                PollErrorKind::Pending,
                r#"{"error":"authorization_pending"}"#,
            ))
        })
    }

    async fn revoke_token(&self, refresh_token: &str) -> Result<(), OAuth2Error> {
        lock(&self.revoke_history).push(refresh_token.to_string());

        if *lock(&self.revoke_should_fail) {
            return Err(OAuth2Error::Network(NetworkError::ConnectionFailed {
                message: "Mock revocation failure".to_string(),
            }));
        }

        Ok(())
    }

    async fn fetch_userinfo(&self, _access_token: &str) -> Result<serde_json::Value, OAuth2Error> {
        lock(&self.userinfo)
            .clone()
            .ok_or_else(|| create_error_from_response(401, r#"{"error":"invalid_token"}"#))
    }
}

/// Create mock authorization server client for testing.
pub fn create_mock_device_authorization_client() -> MockDeviceAuthorizationClient {
    MockDeviceAuthorizationClient::new()
}
