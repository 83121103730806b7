//! Engine-wide settings shared by every email rendered in one session.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use super::theme::Theme;
use crate::themes::DefaultTheme;

/// Configuration for one rendering session.
///
/// Values are defaulted in place before every render; clone the config when
/// rendering concurrently.
#[derive(Clone, Default)]
pub struct EngineConfig {
    pub theme: Option<Arc<dyn Theme>>,
    pub text_direction: Option<TextDirection>,
    pub product: Product,
    pub disable_css_inlining: bool,
}

impl EngineConfig {
    /// Theme `default`, left-to-right text and the built-in product branding.
    pub fn builtin_defaults() -> Self {
        Self {
            theme: Some(Arc::new(DefaultTheme)),
            text_direction: Some(TextDirection::LeftToRight),
            product: Product::builtin_defaults(),
            disable_css_inlining: false,
        }
    }

    pub fn with_theme(mut self, theme: Arc<dyn Theme>) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn theme_name(&self) -> Option<&str> {
        self.theme.as_deref().map(Theme::name)
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("theme", &self.theme_name())
            .field("text_direction", &self.text_direction)
            .field("product", &self.product)
            .field("disable_css_inlining", &self.disable_css_inlining)
            .finish()
    }
}

impl PartialEq for EngineConfig {
    fn eq(&self, other: &Self) -> bool {
        self.theme_name() == other.theme_name()
            && self.text_direction == other.text_direction
            && self.product == other.product
            && self.disable_css_inlining == other.disable_css_inlining
    }
}

/// Direction of the text inside the email.
///
/// Values parsed from configuration that are neither `ltr` nor `rtl` are kept
/// as [`TextDirection::Unrecognized`] until engine defaulting coerces them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TextDirection {
    #[default]
    LeftToRight,
    RightToLeft,
    Unrecognized(String),
}

impl TextDirection {
    pub fn as_str(&self) -> &str {
        match self {
            Self::LeftToRight => "ltr",
            Self::RightToLeft => "rtl",
            Self::Unrecognized(value) => value.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<&str> for TextDirection {
    fn from(value: &str) -> Self {
        match value.trim() {
            "ltr" => Self::LeftToRight,
            "rtl" => Self::RightToLeft,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for TextDirection {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<TextDirection> for String {
    fn from(value: TextDirection) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Branding shown in the email header and footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub name: Option<String>,
    /// Homepage, e.g. `https://example.com/`.
    pub link: Option<String>,
    /// Logo URL.
    pub logo: Option<String>,
    pub copyright: Option<String>,
    /// Sentence shown under action buttons; `{ACTION}` is replaced by the button label.
    pub trouble_text: Option<String>,
}

impl Product {
    pub fn builtin_defaults() -> Self {
        Self {
            name: Some("Mailsmith".to_string()),
            link: None,
            logo: None,
            copyright: Some("Copyright © 2026 Mailsmith. All rights reserved.".to_string()),
            trouble_text: Some(
                "If you’re having trouble with the button '{ACTION}', copy and paste the URL below into your web browser."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_direction_parses_known_values() {
        assert_eq!(TextDirection::from("ltr"), TextDirection::LeftToRight);
        assert_eq!(TextDirection::from(" rtl "), TextDirection::RightToLeft);
        assert_eq!(
            TextDirection::from("sideways"),
            TextDirection::Unrecognized("sideways".to_string())
        );
    }

    #[test]
    fn text_direction_serializes_as_plain_string() {
        let json = serde_json::to_string(&TextDirection::RightToLeft).expect("serializes");
        assert_eq!(json, "\"rtl\"");

        let parsed: TextDirection = serde_json::from_str("\"ltr\"").expect("deserializes");
        assert_eq!(parsed, TextDirection::LeftToRight);
    }
}
