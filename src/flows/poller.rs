//! Background Poller
//!
//! Server-driven scheduling: one tokio task per flow sleeps for the current polling
//! interval and then polls, until the flow leaves Pending or a newer flow replaces it.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::machine::DeviceFlowMachine;
use crate::types::{FlowStatus, DEFAULT_POLLING_INTERVAL_SECS};

/// Owner of the polling task for the active device code.
pub struct BackgroundPoller {
    machine: Arc<DeviceFlowMachine>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundPoller {
    pub fn new(machine: Arc<DeviceFlowMachine>) -> Self {
        Self {
            machine,
            task: Mutex::new(None),
        }
    }

    /// Start polling for `device_code`, replacing any earlier task.
    pub fn arm(&self, device_code: impl Into<String>) {
        let device_code = device_code.into();
        let machine = self.machine.clone();
        let handle = tokio::spawn(poll_until_settled(machine, device_code));

        if let Some(previous) = self.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the current task, if any.
    pub fn cancel(&self) {
        if let Some(task) = self.lock().take() {
            task.abort();
            debug!("Background polling cancelled");
        }
    }

    /// Check if a polling task is still alive.
    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|task| !task.is_finished())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for BackgroundPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn poll_until_settled(machine: Arc<DeviceFlowMachine>, device_code: String) {
    loop {
        let state = match machine.state().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Background poller could not read flow state, stopping");
                return;
            }
        };

        if state.status() != FlowStatus::Pending
            || state.device_code.as_deref() != Some(device_code.as_str())
        {
            debug!(status = state.status().as_str(), "Background polling finished");
            return;
        }

        // Re-read every round so slow_down increases take effect
        let interval = state
            .polling_interval_secs
            .unwrap_or(DEFAULT_POLLING_INTERVAL_SECS);
        tokio::time::sleep(Duration::from_secs(interval)).await;

        match machine.check_once_for(&device_code).await {
            Ok(snapshot) if snapshot.status != FlowStatus::Pending => {
                info!(status = snapshot.status.as_str(), "Device flow settled");
                return;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Background poll failed"),
        }
    }
}
