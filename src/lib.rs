//! Theme-driven transactional email rendering.
//!
//! Structured [`domain::content::EmailContent`] goes in; inlined HTML and
//! plain text come out of [`application::render::Renderer`]. Generated
//! emails can be stored with [`infra::artifacts::ArtifactStore`] and sent
//! through [`application::delivery::Mailer`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod samples;
pub mod themes;
