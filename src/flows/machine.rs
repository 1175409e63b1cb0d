//! Device Flow State Machine
//!
//! Lifecycle of the single in-flight device authorization:
//! Idle -> Pending -> Authorized | Errored.
//!
//! Every read-modify-write of the flow slots runs under one async mutex that is held
//! across the upstream poll, so polls for a device code never overlap and interval
//! increases are never lost.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::device::DeviceAuthorizationClient;
use crate::error::OAuth2Error;
use crate::store::{load_flow_state, read_slot, write_slot, Slot, StateStore};
use crate::types::{
    DeviceAuthorizationResponse, DeviceCodeParams, FlowState, FlowStatus, PollErrorKind,
    StatusSnapshot, TokenRecord, DEFAULT_POLLING_INTERVAL_SECS, SLOW_DOWN_INCREMENT_SECS,
};

/// Reason recorded when the device code deadline passes locally.
const EXPIRED_REASON: &str = "expired_token";

#[derive(Default)]
struct PollBookkeeping {
    last_polled_at: Option<Instant>,
}

impl PollBookkeeping {
    fn is_due(&self, interval_secs: u64) -> bool {
        match self.last_polled_at {
            None => true,
            Some(at) => at.elapsed() >= Duration::from_secs(interval_secs),
        }
    }
}

/// Device flow state machine.
pub struct DeviceFlowMachine {
    client: Arc<dyn DeviceAuthorizationClient>,
    store: Arc<dyn StateStore>,
    guard: Mutex<PollBookkeeping>,
}

impl DeviceFlowMachine {
    /// Create a machine over an authorization server client and a state store.
    pub fn new(client: Arc<dyn DeviceAuthorizationClient>, store: Arc<dyn StateStore>) -> Self {
        Self {
            client,
            store,
            guard: Mutex::new(PollBookkeeping::default()),
        }
    }

    /// Start a new flow, discarding whatever the previous one left behind.
    ///
    /// On failure the machine is left Idle.
    pub async fn start(
        &self,
        params: DeviceCodeParams,
    ) -> Result<DeviceAuthorizationResponse, OAuth2Error> {
        let mut book = self.guard.lock().await;

        self.store.clear().await?;
        *book = PollBookkeeping::default();

        let response = match self.client.request_device_code(params).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Failed to start device authorization");
                return Err(e);
            }
        };

        let interval = response.polling_interval();
        let expires_at = response.expires_in.and_then(|secs| {
            let lifetime = chrono::Duration::try_seconds(i64::try_from(secs).ok()?)?;
            Utc::now().checked_add_signed(lifetime)
        });

        let store = &*self.store;
        write_slot(store, Slot::PollingInterval, &interval).await?;
        if let Some(expires_at) = &expires_at {
            write_slot(store, Slot::ExpiresAt, expires_at).await?;
        }
        // Written last: its presence is what makes the flow Pending
        write_slot(store, Slot::DeviceCode, response.device_code.as_str()).await?;

        info!(
            user_code = %response.user_code,
            verification_uri = %response.verification_uri,
            interval,
            expires_in = ?response.expires_in,
            "Device authorization started"
        );

        Ok(response)
    }

    /// Poll once if a flow is pending.
    pub async fn check_once(&self) -> Result<StatusSnapshot, OAuth2Error> {
        let mut book = self.guard.lock().await;
        let state = self.check_locked(&mut book, None).await?;
        Ok(state.snapshot())
    }

    /// Poll once, but only while `device_code` is still the active one.
    ///
    /// Ticks scheduled for an earlier flow are discarded.
    pub async fn check_once_for(&self, device_code: &str) -> Result<StatusSnapshot, OAuth2Error> {
        let mut book = self.guard.lock().await;
        let state = self.check_locked(&mut book, Some(device_code)).await?;
        Ok(state.snapshot())
    }

    /// Status for a caller, polling first when the interval has elapsed.
    pub async fn current_status(&self) -> Result<StatusSnapshot, OAuth2Error> {
        let mut book = self.guard.lock().await;
        let state = load_flow_state(&*self.store).await?;

        if state.status() != FlowStatus::Pending {
            return Ok(state.snapshot());
        }

        let interval = state
            .polling_interval_secs
            .unwrap_or(DEFAULT_POLLING_INTERVAL_SECS);
        if !book.is_due(interval) {
            debug!(interval, "Status queried before interval elapsed, not polling");
            return Ok(state.snapshot());
        }

        let state = self.check_locked(&mut book, None).await?;
        Ok(state.snapshot())
    }

    /// Current flow state without polling.
    pub async fn state(&self) -> Result<FlowState, OAuth2Error> {
        load_flow_state(&*self.store).await
    }

    /// Current status without polling.
    pub async fn snapshot(&self) -> Result<StatusSnapshot, OAuth2Error> {
        Ok(self.state().await?.snapshot())
    }

    /// Stored access token, if authorized.
    pub async fn access_token(&self) -> Result<Option<String>, OAuth2Error> {
        let token = read_slot::<TokenRecord, _>(&*self.store, Slot::Token).await?;
        Ok(token.map(|t| t.access_token))
    }

    /// Fetch the user profile with the stored access token.
    ///
    /// Returns `None` when no token is held.
    pub async fn fetch_userinfo(&self) -> Result<Option<serde_json::Value>, OAuth2Error> {
        match self.access_token().await? {
            Some(access_token) => self.client.fetch_userinfo(&access_token).await.map(Some),
            None => Ok(None),
        }
    }

    /// Revoke the refresh token when there is one and return to Idle.
    ///
    /// Revocation is best effort; local state is cleared whatever it returns.
    pub async fn logout(&self) -> Result<(), OAuth2Error> {
        let mut book = self.guard.lock().await;

        let token = match read_slot::<TokenRecord, _>(&*self.store, Slot::Token).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Unreadable token on logout, skipping revocation");
                None
            }
        };

        self.store.clear().await?;
        *book = PollBookkeeping::default();

        if let Some(refresh_token) = token
            .as_ref()
            .filter(|t| t.has_refresh_token())
            .and_then(|t| t.refresh_token.as_deref())
        {
            match self.client.revoke_token(refresh_token).await {
                Ok(()) => debug!("Refresh token revoked"),
                Err(e) => warn!(error = %e, "Refresh token revocation failed"),
            }
        }

        info!("Logged out");
        Ok(())
    }

    async fn check_locked(
        &self,
        book: &mut PollBookkeeping,
        expected_device_code: Option<&str>,
    ) -> Result<FlowState, OAuth2Error> {
        let store = &*self.store;
        let state = load_flow_state(store).await?;

        if state.status() != FlowStatus::Pending {
            return Ok(state);
        }
        let device_code = match state.device_code.as_deref() {
            Some(code) => code,
            None => return Ok(state),
        };

        if let Some(expected) = expected_device_code {
            if expected != device_code {
                debug!("Discarding poll for a superseded device code");
                return Ok(state);
            }
        }

        if state.is_expired_at(Utc::now()) {
            info!("Device code expired before authorization");
            self.fail(EXPIRED_REASON).await?;
            return load_flow_state(store).await;
        }

        book.last_polled_at = Some(Instant::now());

        match self.client.poll_token(device_code).await {
            Ok(token) => {
                write_slot(store, Slot::Token, &token).await?;
                info!(token = ?token, "Device authorized");
            }
            Err(e) if e.kind.is_terminal() => {
                let reason = e.reason();
                info!(kind = ?e.kind, reason = %reason, "Device authorization failed");
                self.fail(&reason).await?;
            }
            Err(e) => match e.kind {
                PollErrorKind::SlowDown => {
                    let interval = state
                        .polling_interval_secs
                        .unwrap_or(DEFAULT_POLLING_INTERVAL_SECS)
                        .saturating_add(SLOW_DOWN_INCREMENT_SECS);
                    write_slot(store, Slot::PollingInterval, &interval).await?;
                    info!(interval, "Authorization server asked to slow down");
                }
                PollErrorKind::Network => {
                    warn!(error = %e.raw, "Token poll could not reach the authorization server");
                }
                _ => {
                    debug!("Authorization pending");
                }
            },
        }

        load_flow_state(store).await
    }

    async fn fail(&self, reason: &str) -> Result<(), OAuth2Error> {
        let store = &*self.store;
        write_slot(store, Slot::FlowError, reason).await?;
        store.delete(Slot::DeviceCode).await?;
        store.delete(Slot::PollingInterval).await?;
        store.delete(Slot::ExpiresAt).await?;
        Ok(())
    }
}
