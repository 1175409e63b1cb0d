//! Device authorization agent binary.
//!
//! Loads `.env`, reads the configuration from the environment and serves the
//! endpoint layer on `0.0.0.0:$PORT`.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use device_flow_agent::{
    create_in_memory_state_store, create_transport, init_logging, router, AgentConfigBuilder,
    AppState, DeviceFlowMachine, HttpDeviceAuthorizationClient, LogConfig, NetworkError,
    OAuth2Error, PollingMode,
};

#[tokio::main]
async fn main() {
    // Missing .env is fine, the environment may already be set
    let _ = dotenvy::dotenv();

    let log_config = match LogConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    init_logging(&log_config);

    if let Err(e) = run().await {
        error!(error = %e, code = e.error_code(), "Agent stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), OAuth2Error> {
    let config = AgentConfigBuilder::from_env()?;

    let transport = Arc::new(create_transport(Some(config.timeout))?);
    let client = Arc::new(HttpDeviceAuthorizationClient::new(config.clone(), transport));
    let store = Arc::new(create_in_memory_state_store());
    let machine = Arc::new(DeviceFlowMachine::new(client, store));

    let state = Arc::new(AppState::new(machine, config.polling_mode));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        OAuth2Error::Network(NetworkError::ConnectionFailed {
            message: format!("failed to bind {}: {}", addr, e),
        })
    })?;

    info!(
        %addr,
        issuer = %config.provider.issuer,
        polling_mode = config.polling_mode.as_str(),
        "Device authorization agent listening"
    );
    if config.polling_mode == PollingMode::Background {
        info!("Token polling runs in the background after /authorize");
    }

    axum::serve(listener, app).await.map_err(|e| {
        OAuth2Error::Network(NetworkError::ConnectionFailed {
            message: format!("server error: {}", e),
        })
    })
}
