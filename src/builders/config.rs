//! Configuration Builder
//!
//! Fluent builder for the agent configuration, and environment loading.

use std::time::Duration;

use crate::error::{ConfigurationError, OAuth2Error};
use crate::types::{
    AgentConfig, PollingMode, ProviderConfig, DEFAULT_PORT, DEFAULT_SCOPE, DEFAULT_TIMEOUT_MS,
};

/// Agent configuration builder.
#[derive(Default)]
pub struct AgentConfigBuilder {
    issuer_domain: Option<String>,
    client_id: Option<String>,
    default_scopes: Option<Vec<String>>,
    audience: Option<String>,
    timeout: Option<Duration>,
    port: Option<u16>,
    polling_mode: Option<PollingMode>,
}

impl AgentConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from process environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ISSUER_DOMAIN` (required): authorization server host
    /// - `CLIENT_ID` (required): client identifier
    /// - `SCOPE` (optional): space-delimited scopes
    /// - `AUDIENCE` (optional): API audience, omitted from requests when unset
    /// - `PORT` (optional): listen port, default 3000
    /// - `HTTP_TIMEOUT_SECS` (optional): upstream request timeout
    /// - `POLLING_MODE` (optional): `on_query` or `background`
    pub fn from_env() -> Result<AgentConfig, OAuth2Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<AgentConfig, OAuth2Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::new();

        if let Some(issuer) = non_empty("ISSUER_DOMAIN") {
            builder = builder.issuer_domain(issuer);
        }
        if let Some(client_id) = non_empty("CLIENT_ID") {
            builder = builder.client_id(client_id);
        }
        if let Some(scope) = non_empty("SCOPE") {
            builder = builder.scope(&scope);
        }
        if let Some(audience) = non_empty("AUDIENCE") {
            builder = builder.audience(audience);
        }
        if let Some(port) = non_empty("PORT") {
            let port = port.trim().parse::<u16>().map_err(|e| invalid("PORT", e))?;
            builder = builder.port(port);
        }
        if let Some(timeout) = non_empty("HTTP_TIMEOUT_SECS") {
            let secs = timeout
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid("HTTP_TIMEOUT_SECS", e))?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(mode) = non_empty("POLLING_MODE") {
            let mode = mode
                .parse::<PollingMode>()
                .map_err(|e| invalid("POLLING_MODE", e))?;
            builder = builder.polling_mode(mode);
        }

        builder.build()
    }

    /// Set the authorization server domain (or full base URL).
    pub fn issuer_domain(mut self, issuer_domain: impl Into<String>) -> Self {
        self.issuer_domain = Some(issuer_domain.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set scopes from a space-delimited string.
    pub fn scope(mut self, scope: &str) -> Self {
        self.default_scopes = Some(scope.split_whitespace().map(String::from).collect());
        self
    }

    /// Add a default scope.
    pub fn add_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scopes
            .get_or_insert_with(Vec::new)
            .push(scope.into());
        self
    }

    /// Set the API audience.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set listen port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the polling model.
    pub fn polling_mode(mut self, mode: PollingMode) -> Self {
        self.polling_mode = Some(mode);
        self
    }

    /// Build the agent configuration.
    pub fn build(self) -> Result<AgentConfig, OAuth2Error> {
        let issuer_domain = self
            .issuer_domain
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| missing("ISSUER_DOMAIN"))?;

        let client_id = self
            .client_id
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| missing("CLIENT_ID"))?;

        let provider = ProviderConfig::from_issuer(&issuer_domain);
        url::Url::parse(&provider.issuer).map_err(|_| {
            OAuth2Error::Configuration(ConfigurationError::InvalidEndpoint {
                url: provider.issuer.clone(),
            })
        })?;

        let default_scopes = self
            .default_scopes
            .unwrap_or_else(|| DEFAULT_SCOPE.split_whitespace().map(String::from).collect());

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS));
        if timeout.is_zero() {
            return Err(OAuth2Error::Configuration(ConfigurationError::InvalidValue {
                field: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            }));
        }

        Ok(AgentConfig {
            provider,
            client_id,
            default_scopes,
            audience: self.audience.filter(|a| !a.trim().is_empty()),
            timeout,
            port: self.port.unwrap_or(DEFAULT_PORT),
            polling_mode: self.polling_mode.unwrap_or_default(),
        })
    }
}

fn missing(field: &str) -> OAuth2Error {
    OAuth2Error::Configuration(ConfigurationError::MissingRequired {
        field: field.to_string(),
    })
}

fn invalid(field: &str, error: impl std::fmt::Display) -> OAuth2Error {
    OAuth2Error::Configuration(ConfigurationError::InvalidValue {
        field: field.to_string(),
        message: error.to_string(),
    })
}

/// Create a new agent configuration builder.
pub fn agent_config() -> AgentConfigBuilder {
    AgentConfigBuilder::new()
}
