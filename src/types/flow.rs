//! Flow State Types
//!
//! The persisted device flow state and the snapshot exposed to status callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TokenRecord;

/// Lifecycle state of the device flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    /// No flow started, or logged out.
    Idle,
    /// Device code issued, waiting for the user.
    Pending,
    /// Token issued.
    Authorized,
    /// Flow ended with a terminal error; only a new start leaves this state.
    #[serde(rename = "error")]
    Errored,
}

impl FlowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Errored => "error",
        }
    }
}

/// State of the single in-flight flow as read from the state store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowState {
    pub device_code: Option<String>,
    pub polling_interval_secs: Option<u64>,
    pub token: Option<TokenRecord>,
    pub error: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl FlowState {
    /// Derive the lifecycle state from which slots are present.
    pub fn status(&self) -> FlowStatus {
        if self.token.is_some() {
            FlowStatus::Authorized
        } else if self.device_code.is_some() {
            FlowStatus::Pending
        } else if self.error.is_some() {
            FlowStatus::Errored
        } else {
            FlowStatus::Idle
        }
    }

    /// Check if the device code deadline has passed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    /// Build the snapshot returned to status callers.
    pub fn snapshot(&self) -> StatusSnapshot {
        let status = self.status();
        StatusSnapshot {
            status,
            token: self.token.clone(),
            interval: match status {
                FlowStatus::Pending => self.polling_interval_secs,
                _ => None,
            },
            error: match status {
                FlowStatus::Errored => self.error.clone(),
                _ => None,
            },
        }
    }
}

/// Response body of the status endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: FlowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenRecord>,
    /// Seconds the caller should wait before asking again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    pub fn is_authorized(&self) -> bool {
        self.status == FlowStatus::Authorized
    }
}
