//! Route Handlers
//!
//! Thin adapters from HTTP to the device flow state machine.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use super::render::{qr_data_url, render_authorize, render_home};
use super::SharedState;
use crate::error::{get_user_message, OAuth2Error};
use crate::types::DeviceCodeParams;

fn internal_error(error: &OAuth2Error) -> Response {
    error!(error = %error, code = error.error_code(), "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": get_user_message(error) })),
    )
        .into_response()
}

/// Landing page.
pub async fn home(State(state): State<SharedState>) -> Response {
    match state.machine.snapshot().await {
        Ok(snapshot) => Html(render_home(snapshot.is_authorized())).into_response(),
        Err(e) => internal_error(&e),
    }
}

/// Start a new device flow and show the user code.
pub async fn authorize(State(state): State<SharedState>) -> Response {
    if let Some(poller) = &state.poller {
        poller.cancel();
    }

    let page = async {
        let response = state.machine.start(DeviceCodeParams::default()).await?;
        let qr = qr_data_url(response.verification_target())?;

        if let Some(poller) = &state.poller {
            poller.arm(response.device_code.clone());
        }

        Ok::<_, OAuth2Error>(render_authorize(&response, &qr))
    };

    match page.await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "Error initiating device flow");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error starting authorization",
            )
                .into_response()
        }
    }
}

/// Flow status as JSON.
///
/// Without a background poller the query itself drives polling.
pub async fn status(State(state): State<SharedState>) -> Response {
    let result = if state.poller.is_some() {
        state.machine.snapshot().await
    } else {
        state.machine.current_status().await
    };

    match result {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => internal_error(&e),
    }
}

/// User profile from the authorization server.
pub async fn userinfo(State(state): State<SharedState>) -> Response {
    match state.machine.fetch_userinfo().await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Not authorized" })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Error fetching user info");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Error fetching user info" })),
            )
                .into_response()
        }
    }
}

/// Revoke, clear local state and return to the landing page.
pub async fn logout(State(state): State<SharedState>) -> Response {
    if let Some(poller) = &state.poller {
        poller.cancel();
    }

    match state.machine.logout().await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => internal_error(&e),
    }
}
