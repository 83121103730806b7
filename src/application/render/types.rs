use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::error::ConfigError;

/// Both renderings of one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub html: String,
    /// Fallback for clients that do not display HTML.
    pub plain_text: String,
}

/// Which of the theme's templates is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Html,
    PlainText,
}

impl RenderFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::PlainText => "plain_text",
        }
    }
}

/// Options forwarded to the HTML-to-text reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOptions {
    /// Lay tables out as aligned text instead of flattening their cells.
    pub preserve_tables: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            preserve_tables: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssInliningError {
    #[error("stylesheet could not be parsed: {message}")]
    Stylesheet { message: String },
    #[error("document rewrite failed: {message}")]
    Rewrite { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("html to text conversion failed: {message}")]
pub struct TextConversionError {
    pub message: String,
}

/// Structured errors surfaced by the rendering pipeline. Every variant is
/// fatal for the (theme, content) pair being rendered.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("engine configuration has no theme")]
    MissingTheme,
    #[error("theme `{theme}` failed to render its {format} template: {source}")]
    Template {
        theme: String,
        format: &'static str,
        #[source]
        source: minijinja::Error,
    },
    #[error(transparent)]
    CssInlining(#[from] CssInliningError),
    #[error(transparent)]
    TextConversion(#[from] TextConversionError),
}

/// Inlines `<style>` rules into `style` attributes.
pub trait CssInliner: Send + Sync {
    fn inline(&self, html: &str) -> Result<String, CssInliningError>;
}

/// Reduces an HTML document to plain text.
pub trait TextReducer: Send + Sync {
    fn reduce(&self, html: &str, options: TextOptions) -> Result<String, TextConversionError>;
}
