//! Domain layer types and invariants.

pub mod content;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod theme;
