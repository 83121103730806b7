//! Built-in themes.
//!
//! Template sources are compiled into the binary. Both themes share the
//! plain-text template; only their HTML differs.

use crate::domain::theme::Theme;

const PLAIN_TEXT_TEMPLATE: &str = include_str!("../../templates/themes/plain.txt");

/// Light theme with a bordered body card.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTheme;

impl Theme for DefaultTheme {
    fn name(&self) -> &str {
        "default"
    }

    fn html_template(&self) -> &str {
        include_str!("../../templates/themes/default.html")
    }

    fn plain_text_template(&self) -> &str {
        PLAIN_TEXT_TEMPLATE
    }
}

/// Dark masthead, flat buttons.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTheme;

impl Theme for FlatTheme {
    fn name(&self) -> &str {
        "flat"
    }

    fn html_template(&self) -> &str {
        include_str!("../../templates/themes/flat.html")
    }

    fn plain_text_template(&self) -> &str {
        PLAIN_TEXT_TEMPLATE
    }
}
