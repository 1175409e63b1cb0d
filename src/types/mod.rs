//! Device Flow Types
//!
//! Core type definitions for the device authorization agent.

pub mod config;
pub mod device;
pub mod flow;
pub mod token;

pub use config::*;
pub use device::*;
pub use flow::*;
pub use token::*;
