//! Device Flow Agent
//!
//! OAuth 2.0 Device Authorization Grant (RFC 8628) as a small server-side agent.
//!
//! # Features
//!
//! - Device code issuance, token polling with `slow_down` backoff (RFC 8628)
//! - Token revocation on logout (RFC 7009)
//! - OIDC userinfo passthrough
//! - Poll-on-query or background polling
//! - Pluggable key-value state store
//!
//! # Example
//!
//! ```rust,ignore
//! use device_flow_agent::{
//!     agent_config, create_in_memory_state_store, create_transport, DeviceCodeParams,
//!     DeviceFlowMachine, HttpDeviceAuthorizationClient,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = agent_config()
//!         .issuer_domain("tenant.example.com")
//!         .client_id("my-client-id")
//!         .build()?;
//!
//!     let transport = Arc::new(create_transport(Some(config.timeout))?);
//!     let client = Arc::new(HttpDeviceAuthorizationClient::new(config, transport));
//!     let machine = DeviceFlowMachine::new(client, Arc::new(create_in_memory_state_store()));
//!
//!     let device = machine.start(DeviceCodeParams::default()).await?;
//!     println!("Visit {} and enter {}", device.verification_uri, device.user_code);
//!
//!     loop {
//!         tokio::time::sleep(std::time::Duration::from_secs(device.polling_interval())).await;
//!         let status = machine.current_status().await?;
//!         if status.is_authorized() {
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, device authorization, token and flow state types
//! - `error`: error hierarchy
//! - `core`: HTTP transport
//! - `store`: key-value state store over the flow slots
//! - `flows`: authorization server client, state machine, background poller
//! - `builders`: fluent configuration builder and environment loading
//! - `server`: axum endpoint layer and HTML rendering
//! - `telemetry`: logging setup

pub mod builders;
pub mod core;
pub mod error;
pub mod flows;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export builders
pub use builders::{agent_config, AgentConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, get_user_message, parse_error_response, ConfigurationError,
    DeviceFlowError, NetworkError, OAuth2Error, OAuth2ErrorResponse, OAuth2Result,
    ProtocolError, StorageError, UpstreamError,
};

// Re-export types
pub use types::{
    // Config
    AgentConfig, PollingMode, ProviderConfig,
    // Device
    DeviceAuthorizationResponse, DeviceCodeParams, PollError, PollErrorKind,
    // Flow
    FlowState, FlowStatus, StatusSnapshot,
    // Token
    TokenRecord,
};

// Re-export core components
pub use core::{
    create_mock_transport, create_transport, HttpMethod, HttpRequest, HttpResponse,
    HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export state store
pub use store::{
    create_in_memory_state_store, create_mock_state_store, InMemoryStateStore, MockStateStore,
    Slot, StateStore,
};

// Re-export flows
pub use flows::{
    create_mock_device_authorization_client, BackgroundPoller, DeviceAuthorizationClient,
    DeviceFlowMachine, HttpDeviceAuthorizationClient, MockDeviceAuthorizationClient,
};

// Re-export server
pub use server::{router, AppState, SharedState};

// Re-export telemetry
pub use telemetry::{init_logging, LogConfig, LogFormat, LogLevel};
