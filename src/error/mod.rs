//! Device Flow Error Types
//!
//! Error hierarchy shared by the authorization server client, the state store, the
//! device flow state machine and the HTTP endpoint layer.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the device flow agent.
#[derive(Error, Debug)]
pub enum OAuth2Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Device flow error: {0}")]
    DeviceFlow(#[from] DeviceFlowError),
}

impl OAuth2Error {
    /// Get error code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "DEVICE_FLOW_CONFIG",
            Self::Network(_) => "DEVICE_FLOW_NETWORK",
            Self::Upstream(_) => "DEVICE_FLOW_UPSTREAM",
            Self::Protocol(_) => "DEVICE_FLOW_PROTOCOL",
            Self::Storage(_) => "DEVICE_FLOW_STORAGE",
            Self::DeviceFlow(_) => "DEVICE_FLOW_STATE",
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

/// Transport failure reaching the authorization server.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },
}

/// Non-success HTTP response from the authorization server.
#[derive(Error, Debug, Clone)]
#[error("HTTP {status}: {}", summary(.body))]
pub struct UpstreamError {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl UpstreamError {
    /// Create from status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parsed OAuth error body, when the server sent one.
    pub fn oauth_error(&self) -> Option<OAuth2ErrorResponse> {
        parse_error_response(&self.body)
    }

    /// Check if the server reported a 5xx status.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

fn summary(body: &str) -> String {
    match parse_error_response(body) {
        Some(response) => match response.error_description {
            Some(description) => format!("{} ({})", response.error, description),
            None => response.error,
        },
        None if body.chars().count() > 200 => {
            format!("{}...", body.chars().take(200).collect::<String>())
        }
        None => body.to_string(),
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },
}

/// State store error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Write failed for slot {slot}: {message}")]
    WriteFailed { slot: String, message: String },

    #[error("Corrupted data in slot {slot}: {message}")]
    CorruptedData { slot: String, message: String },
}

/// Device flow state error.
#[derive(Error, Debug)]
pub enum DeviceFlowError {
    #[error("Failed to render verification QR code: {message}")]
    QrEncoding { message: String },
}

/// Result type for device flow operations.
pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// OAuth2 error response from provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<OAuth2ErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Create error from a non-success HTTP response.
pub fn create_error_from_response(status: u16, body: &str) -> OAuth2Error {
    OAuth2Error::Upstream(UpstreamError::new(status, body))
}

/// Get user-friendly error message.
pub fn get_user_message(error: &OAuth2Error) -> String {
    match error {
        OAuth2Error::Network(NetworkError::Timeout { .. }) => {
            "The authorization server did not respond in time. Please try again.".to_string()
        }
        OAuth2Error::Network(_) => {
            "The authorization server could not be reached. Please try again later.".to_string()
        }
        OAuth2Error::Upstream(e) if e.is_server_error() => {
            "The authorization service is temporarily unavailable. Please try again later."
                .to_string()
        }
        OAuth2Error::Storage(_) => {
            "The device agent could not access its local state.".to_string()
        }
        OAuth2Error::Configuration(_) => {
            "The device agent is misconfigured. Check ISSUER_DOMAIN and CLIENT_ID.".to_string()
        }
        _ => "An authentication error occurred. Please try again.".to_string(),
    }
}
