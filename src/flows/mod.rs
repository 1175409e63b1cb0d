//! Device Flow
//!
//! OAuth2 Device Authorization Grant (RFC 8628).
//!
//! This module provides:
//!
//! - **Client**: typed calls to the authorization server endpoints
//! - **Machine**: the flow lifecycle and its adaptive polling cadence
//! - **Poller**: the optional background task driving the machine

pub mod device;
pub mod machine;
pub mod poller;

pub use device::{
    classify_poll_response, create_mock_device_authorization_client, DeviceAuthorizationClient,
    HttpDeviceAuthorizationClient, MockDeviceAuthorizationClient,
};
pub use machine::DeviceFlowMachine;
pub use poller::BackgroundPoller;
