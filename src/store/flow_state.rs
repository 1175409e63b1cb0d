//! Typed access to the flow slots.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Slot, StateStore};
use crate::error::{OAuth2Error, StorageError};
use crate::types::{FlowState, TokenRecord};

/// Read and decode a slot.
pub async fn read_slot<T, S>(store: &S, slot: Slot) -> Result<Option<T>, OAuth2Error>
where
    T: DeserializeOwned,
    S: StateStore + ?Sized,
{
    match store.get(slot).await? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
            OAuth2Error::Storage(StorageError::CorruptedData {
                slot: slot.to_string(),
                message: e.to_string(),
            })
        }),
    }
}

/// Encode and write a slot.
pub async fn write_slot<T, S>(store: &S, slot: Slot, value: &T) -> Result<(), OAuth2Error>
where
    T: Serialize + Sync + ?Sized,
    S: StateStore + ?Sized,
{
    let value = serde_json::to_value(value).map_err(|e| {
        OAuth2Error::Storage(StorageError::WriteFailed {
            slot: slot.to_string(),
            message: e.to_string(),
        })
    })?;
    store.set(slot, value).await
}

/// Load the whole flow state.
pub async fn load_flow_state<S>(store: &S) -> Result<FlowState, OAuth2Error>
where
    S: StateStore + ?Sized,
{
    Ok(FlowState {
        device_code: read_slot::<String, _>(store, Slot::DeviceCode).await?,
        polling_interval_secs: read_slot::<u64, _>(store, Slot::PollingInterval).await?,
        token: read_slot::<TokenRecord, _>(store, Slot::Token).await?,
        error: read_slot::<String, _>(store, Slot::FlowError).await?,
        expires_at: read_slot::<DateTime<Utc>, _>(store, Slot::ExpiresAt).await?,
    })
}
