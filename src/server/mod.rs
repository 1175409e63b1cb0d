//! HTTP Endpoint Layer
//!
//! axum router exposing the device flow:
//!
//! - `GET /` - landing page showing whether the agent is authorized
//! - `GET /authorize` - start a flow, show the user code and QR code
//! - `GET /status` - flow status as JSON
//! - `GET /userinfo` - user profile fetched with the stored access token
//! - `GET /logout` - revoke and clear, then redirect to `/`

pub mod render;
pub mod routes;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::flows::{BackgroundPoller, DeviceFlowMachine};
use crate::types::PollingMode;

pub use render::{escape_html, qr_data_url, render_authorize, render_home};

/// Shared handler state.
pub struct AppState {
    pub machine: Arc<DeviceFlowMachine>,
    /// Present in background polling mode.
    pub poller: Option<BackgroundPoller>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(machine: Arc<DeviceFlowMachine>, mode: PollingMode) -> Self {
        let poller = match mode {
            PollingMode::Background => Some(BackgroundPoller::new(machine.clone())),
            PollingMode::OnQuery => None,
        };

        Self { machine, poller }
    }
}

/// Build the router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes::home))
        .route("/authorize", get(routes::authorize))
        .route("/status", get(routes::status))
        .route("/userinfo", get(routes::userinfo))
        .route("/logout", get(routes::logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
