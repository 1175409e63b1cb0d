//! Builders
//!
//! Fluent builder for the agent configuration.

pub mod config;

pub use config::{agent_config, AgentConfigBuilder};
