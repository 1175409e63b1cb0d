//! Telemetry
//!
//! Logging for the device authorization agent. Events are emitted with `tracing`
//! throughout the crate; this module installs the subscriber.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
