//! Infrastructure adapters and runtime bootstrap.

pub mod client;
pub mod error;
pub mod telemetry;
