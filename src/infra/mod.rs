//! Infrastructure adapters: artifact storage and runtime telemetry.

pub mod artifacts;
pub mod error;
pub mod telemetry;
