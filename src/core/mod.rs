//! Core Components
//!
//! HTTP transport shared by every upstream call.

pub mod transport;

pub use transport::*;
