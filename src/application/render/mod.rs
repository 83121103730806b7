//! Rendering pipeline.
//!
//! Rendering is pure: it accepts an engine configuration and email content,
//! produces deterministic HTML and plain text, and surfaces structured
//! errors. Delivery and persistence happen in the caller.

mod context;
mod engine;
mod service;
mod theme;
mod types;

pub use context::{EngineView, TemplateContext, environment};
pub use engine::{
    Defaults, METRIC_RENDER_FAILURES_TOTAL, METRIC_RENDER_MS, METRIC_RENDER_TOTAL, Renderer,
};
pub use service::{DEFAULT_TEXT_WIDTH, Html2TextReducer, StyleInliner, markdown_to_html};
pub use theme::{Theme, ThemeRegistry};
pub use types::{
    CssInliner, CssInliningError, RenderError, RenderFormat, RenderedEmail, TextConversionError,
    TextOptions, TextReducer,
};
