//! State Storage
//!
//! Key-value contract over the named slots of the device flow, with an in-memory
//! implementation and a mock for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{OAuth2Error, StorageError};

/// Named slot of the flow state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    DeviceCode,
    PollingInterval,
    Token,
    FlowError,
    ExpiresAt,
}

impl Slot {
    /// Every slot, in the order they are cleared.
    pub const ALL: [Slot; 5] = [
        Slot::Token,
        Slot::DeviceCode,
        Slot::PollingInterval,
        Slot::ExpiresAt,
        Slot::FlowError,
    ];

    /// Stable key used by external backings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceCode => "device_code",
            Self::PollingInterval => "polling_interval",
            Self::Token => "token",
            Self::FlowError => "flow_error",
            Self::ExpiresAt => "expires_at",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State store interface.
///
/// Implementations only need read-your-writes consistency within a process; the
/// state machine serializes every read-modify-write sequence itself.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a slot.
    async fn get(&self, slot: Slot) -> Result<Option<serde_json::Value>, OAuth2Error>;

    /// Write a slot.
    async fn set(&self, slot: Slot, value: serde_json::Value) -> Result<(), OAuth2Error>;

    /// Remove a slot, returning whether it was present.
    async fn delete(&self, slot: Slot) -> Result<bool, OAuth2Error>;

    /// Remove every slot.
    async fn clear(&self) -> Result<(), OAuth2Error> {
        for slot in Slot::ALL {
            self.delete(slot).await?;
        }
        Ok(())
    }
}

/// In-memory state store implementation.
#[derive(Default)]
pub struct InMemoryStateStore {
    slots: Mutex<HashMap<Slot, serde_json::Value>>,
}

impl InMemoryStateStore {
    /// Create new in-memory state store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Slot, serde_json::Value>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, slot: Slot) -> Result<Option<serde_json::Value>, OAuth2Error> {
        Ok(self.lock().get(&slot).cloned())
    }

    async fn set(&self, slot: Slot, value: serde_json::Value) -> Result<(), OAuth2Error> {
        self.lock().insert(slot, value);
        Ok(())
    }

    async fn delete(&self, slot: Slot) -> Result<bool, OAuth2Error> {
        Ok(self.lock().remove(&slot).is_some())
    }

    async fn clear(&self) -> Result<(), OAuth2Error> {
        self.lock().clear();
        Ok(())
    }
}

/// Mock state store for testing.
#[derive(Default)]
pub struct MockStateStore {
    slots: Mutex<HashMap<Slot, serde_json::Value>>,
    set_history: Mutex<Vec<(Slot, serde_json::Value)>>,
    delete_history: Mutex<Vec<Slot>>,
    should_fail_writes: Mutex<bool>,
}

impl MockStateStore {
    /// Create new mock state store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail.
    pub fn set_should_fail_writes(&self, should_fail: bool) -> &Self {
        *self
            .should_fail_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = should_fail;
        self
    }

    /// Pre-populate a slot.
    pub fn add_value(&self, slot: Slot, value: serde_json::Value) -> &Self {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slot, value);
        self
    }

    /// Get set history.
    pub fn get_set_history(&self) -> Vec<(Slot, serde_json::Value)> {
        self.set_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Get delete history.
    pub fn get_delete_history(&self) -> Vec<Slot> {
        self.delete_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check_write(&self, slot: Slot) -> Result<(), OAuth2Error> {
        if *self
            .should_fail_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
        {
            return Err(OAuth2Error::Storage(StorageError::WriteFailed {
                slot: slot.to_string(),
                message: "Mock storage failure".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for MockStateStore {
    async fn get(&self, slot: Slot) -> Result<Option<serde_json::Value>, OAuth2Error> {
        Ok(self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&slot)
            .cloned())
    }

    async fn set(&self, slot: Slot, value: serde_json::Value) -> Result<(), OAuth2Error> {
        self.check_write(slot)?;

        self.set_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((slot, value.clone()));
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slot, value);
        Ok(())
    }

    async fn delete(&self, slot: Slot) -> Result<bool, OAuth2Error> {
        self.check_write(slot)?;

        self.delete_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(slot);
        Ok(self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&slot)
            .is_some())
    }
}

/// Create in-memory state store.
pub fn create_in_memory_state_store() -> InMemoryStateStore {
    InMemoryStateStore::new()
}

/// Create mock state store for testing.
pub fn create_mock_state_store() -> MockStateStore {
    MockStateStore::new()
}
