use std::fmt;

/// Capability every theme provides: a stable name plus the template sources
/// used for the HTML and plain-text renderings.
///
/// Both sources are written in the template language understood by the
/// renderer and are parameterised over `engine` and `email`. The plain-text
/// source may contain basic HTML; its output is reduced to text afterwards.
pub trait Theme: Send + Sync {
    /// Identifier used for registry lookups and artifact paths.
    fn name(&self) -> &str;

    fn html_template(&self) -> &str;

    fn plain_text_template(&self) -> &str;
}

impl fmt::Debug for dyn Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Theme").field("name", &self.name()).finish()
    }
}
