//! State Store
//!
//! The key-value contract the device flow persists through.
//!
//! This module provides:
//!
//! - **Storage**: the `StateStore` trait over named slots, in-memory and mock backings
//! - **Flow state**: typed slot access and loading of the whole `FlowState`

pub mod flow_state;
pub mod storage;

pub use flow_state::{load_flow_state, read_slot, write_slot};
pub use storage::{
    create_in_memory_state_store, create_mock_state_store, InMemoryStateStore, MockStateStore,
    Slot, StateStore,
};
