//! Configuration Types
//!
//! Agent configuration: authorization server endpoints, client identity, requested
//! scopes and the polling model.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Device agent configuration.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Authorization server endpoints.
    pub provider: ProviderConfig,
    /// Client identifier registered with the authorization server.
    pub client_id: String,
    /// Scopes requested when starting a flow.
    pub default_scopes: Vec<String>,
    /// API audience, sent only when set.
    pub audience: Option<String>,
    /// HTTP timeout for upstream calls.
    pub timeout: Duration,
    /// Port the endpoint layer listens on.
    pub port: u16,
    /// Who drives the token polling.
    pub polling_mode: PollingMode,
}

impl AgentConfig {
    /// Space-delimited scope string as sent on the wire.
    pub fn scope_string(&self) -> String {
        self.default_scopes.join(" ")
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            client_id: String::new(),
            default_scopes: DEFAULT_SCOPE.split_whitespace().map(String::from).collect(),
            audience: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            port: DEFAULT_PORT,
            polling_mode: PollingMode::default(),
        }
    }
}

/// Authorization server endpoint configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Issuer base URL, e.g. `https://tenant.example.com`.
    pub issuer: String,
    /// Device authorization endpoint URL.
    pub device_authorization_endpoint: String,
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// Token revocation endpoint URL.
    pub revocation_endpoint: String,
    /// OIDC userinfo endpoint URL.
    pub userinfo_endpoint: String,
}

impl ProviderConfig {
    /// Derive the standard endpoint layout from an issuer domain.
    ///
    /// A bare host becomes `https://{host}`; a value that already carries a scheme is
    /// used as-is, which lets tests point the agent at a local mock server.
    pub fn from_issuer(issuer_domain: &str) -> Self {
        let trimmed = issuer_domain.trim().trim_end_matches('/');
        let issuer = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        Self {
            device_authorization_endpoint: format!("{}/oauth/device/code", issuer),
            token_endpoint: format!("{}/oauth/token", issuer),
            revocation_endpoint: format!("{}/oauth/revoke", issuer),
            userinfo_endpoint: format!("{}/userinfo", issuer),
            issuer,
        }
    }
}

/// Scheduling model for token polling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingMode {
    /// Each status query performs at most one poll; no background task.
    #[default]
    OnQuery,
    /// A background task polls on the server-provided cadence.
    Background,
}

impl PollingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnQuery => "on_query",
            Self::Background => "background",
        }
    }
}

impl std::str::FromStr for PollingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on_query" | "on-query" | "query" => Ok(Self::OnQuery),
            "background" | "timer" => Ok(Self::Background),
            other => Err(format!("Unknown polling mode: {}", other)),
        }
    }
}

/// RFC 8628 grant type for device code token requests.
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SCOPE: &str = "openid profile email offline_access";
