//! Token Types
//!
//! The token set issued once the user approves the device.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token set returned by the token endpoint.
///
/// Only `access_token` is required; every other field the server sends is kept and
/// passed through unchanged to `/status` callers.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct TokenRecord {
    /// Access token.
    pub access_token: String,
    /// ID token (OIDC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Refresh token, present when `offline_access` was granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<serde_json::Value>,
    /// Token type (usually "Bearer"), as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<serde_json::Value>,
    /// Granted scopes, as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<serde_json::Value>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenRecord {
    /// Create a record holding only an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            id_token: None,
            refresh_token: None,
            expires_in: None,
            token_type: None,
            scope: None,
            extra: HashMap::new(),
        }
    }

    /// Build a record from a token endpoint body.
    ///
    /// Returns `None` unless the body carries a string `access_token`. A field of
    /// unexpected type never rejects the record; it is kept in `extra` instead.
    pub fn from_response_body(body: serde_json::Value) -> Option<Self> {
        let serde_json::Value::Object(mut fields) = body else {
            return None;
        };

        let access_token = match fields.remove("access_token") {
            Some(serde_json::Value::String(token)) => token,
            _ => return None,
        };

        let id_token = take_string(&mut fields, "id_token");
        let refresh_token = take_string(&mut fields, "refresh_token");
        let mut take_value = |key: &str| fields.remove(key).filter(|v| !v.is_null());
        let expires_in = take_value("expires_in");
        let token_type = take_value("token_type");
        let scope = take_value("scope");

        Some(Self {
            access_token,
            id_token,
            refresh_token,
            expires_in,
            token_type,
            scope,
            extra: fields.into_iter().collect(),
        })
    }

    /// Check if has refresh token.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl TryFrom<serde_json::Value> for TokenRecord {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_response_body(value).ok_or_else(|| "missing string access_token".to_string())
    }
}

fn take_string(
    fields: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<String> {
    match fields.remove(key) {
        Some(serde_json::Value::String(value)) => Some(value),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}
