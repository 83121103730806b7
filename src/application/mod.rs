//! Application services: rendering, batch generation and delivery.

pub mod delivery;
pub mod error;
pub mod generate;
pub mod render;
