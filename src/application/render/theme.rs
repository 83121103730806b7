//! Theme lookup by name.

use std::{collections::BTreeMap, sync::Arc};

pub use crate::domain::theme::Theme;
use crate::themes::{DefaultTheme, FlatTheme};

/// Themes available to a rendering session, keyed by [`Theme::name`].
#[derive(Debug, Clone, Default)]
pub struct ThemeRegistry {
    themes: BTreeMap<String, Arc<dyn Theme>>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `default` and `flat` themes.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DefaultTheme));
        registry.register(Arc::new(FlatTheme));
        registry
    }

    /// Add a theme, returning the one it replaces.
    pub fn register(&mut self, theme: Arc<dyn Theme>) -> Option<Arc<dyn Theme>> {
        self.themes.insert(theme.name().to_string(), theme)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Theme>> {
        self.themes.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Theme>> {
        self.themes.values()
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Keep only the named themes; unknown names are returned as the error.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, Vec<String>> {
        if names.is_empty() {
            return Ok(self.clone());
        }

        let mut selected = Self::new();
        let mut unknown = Vec::new();
        for name in names {
            match self.get(name.as_ref()) {
                Some(theme) => {
                    selected.register(theme);
                }
                None => unknown.push(name.as_ref().to_string()),
            }
        }

        if unknown.is_empty() {
            Ok(selected)
        } else {
            Err(unknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Custom;

    impl Theme for Custom {
        fn name(&self) -> &str {
            "custom"
        }

        fn html_template(&self) -> &str {
            "<p>{{ email.name }}</p>"
        }

        fn plain_text_template(&self) -> &str {
            "{{ email.name }}"
        }
    }

    #[test]
    fn builtin_registry_lists_default_and_flat() {
        let registry = ThemeRegistry::builtin();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["default", "flat"]);
        assert_eq!(
            registry.get("flat").map(|theme| theme.name().to_string()),
            Some("flat".to_string())
        );
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn registering_a_theme_needs_no_renderer_changes() {
        let mut registry = ThemeRegistry::builtin();

        assert!(registry.register(Arc::new(Custom)).is_none());
        assert_eq!(registry.len(), 3);
        assert!(registry.register(Arc::new(Custom)).is_some());
    }

    #[test]
    fn select_reports_unknown_names() {
        let registry = ThemeRegistry::builtin();

        let selected = registry.select(&["flat"]).expect("flat exists");
        assert_eq!(selected.names().collect::<Vec<_>>(), vec!["flat"]);

        let unknown = registry.select(&["flat", "neon"]).expect_err("neon is unknown");
        assert_eq!(unknown, vec!["neon".to_string()]);

        assert_eq!(registry.select::<&str>(&[]).expect("all").len(), 2);
    }
}
