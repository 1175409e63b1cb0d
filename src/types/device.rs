//! Device Authorization Types
//!
//! Types for OAuth2 Device Authorization Flow (RFC 8628).

use serde::{Deserialize, Serialize};

/// Device code request parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceCodeParams {
    /// Scopes to request; the configured defaults are used when `None`.
    pub scopes: Option<Vec<String>>,
    /// API audience; the configured audience is used when `None`.
    pub audience: Option<String>,
}

/// Device authorization response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
    /// Device verification code (not shown to user).
    pub device_code: String,
    /// User code to display.
    pub user_code: String,
    /// URI for user to visit.
    #[serde(default, alias = "verification_url")]
    pub verification_uri: String,
    /// URI with code pre-filled (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Minimum polling interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

impl DeviceAuthorizationResponse {
    /// Get polling interval (default 5 seconds per RFC 8628, never below 1).
    pub fn polling_interval(&self) -> u64 {
        self.interval.unwrap_or(DEFAULT_POLLING_INTERVAL_SECS).max(1)
    }

    /// URI to encode in the QR code: the pre-filled one when available.
    pub fn verification_target(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .unwrap_or(&self.verification_uri)
    }
}

/// Classified failure of a single token poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollErrorKind {
    /// `authorization_pending`: the user has not approved yet.
    Pending,
    /// `slow_down`: the poller must widen its interval.
    SlowDown,
    /// `access_denied`: the user refused.
    Denied,
    /// `expired_token`: the device code lifetime elapsed.
    Expired,
    /// Any other OAuth error or non-success response.
    Other,
    /// The authorization server could not be reached.
    Network,
}

impl PollErrorKind {
    /// Map a standard OAuth error code.
    pub fn from_error_code(code: &str) -> Self {
        match code {
            "authorization_pending" => Self::Pending,
            "slow_down" => Self::SlowDown,
            "access_denied" => Self::Denied,
            "expired_token" => Self::Expired,
            _ => Self::Other,
        }
    }

    /// Check if polling should continue.
    pub fn should_continue_polling(&self) -> bool {
        matches!(self, Self::Pending | Self::SlowDown | Self::Network)
    }

    /// Check if the flow must end in the error state.
    pub fn is_terminal(&self) -> bool {
        !self.should_continue_polling()
    }
}

/// Result of a token poll that did not yield a token.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {raw}")]
pub struct PollError {
    /// Classified outcome.
    pub kind: PollErrorKind,
    /// Raw response body or transport message, kept for logs and the error state.
    pub raw: String,
}

impl PollError {
    pub fn new(kind: PollErrorKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    /// Short reason for the error state: the OAuth `error` code when present.
    pub fn reason(&self) -> String {
        match crate::error::parse_error_response(&self.raw) {
            Some(response) => match response.error_description {
                Some(description) => format!("{}: {}", response.error, description),
                None => response.error,
            },
            None if self.raw.is_empty() => format!("{:?}", self.kind),
            None => self.raw.clone(),
        }
    }
}

/// Default polling interval when the server omits one.
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 5;

/// Interval increase demanded by each `slow_down` response.
pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;
