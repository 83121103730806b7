//! Default merging: fill unset fields from an explicit defaults value.
//!
//! Presence is decided by `Option`, never by comparing against an empty
//! value, so an intentionally empty greeting or sequence survives merging.

use tracing::warn;

use super::{
    content::EmailContent,
    engine::{EngineConfig, Product, TextDirection},
    error::ConfigError,
};

/// Merge defaults into `self`, replacing only unset fields.
pub trait MergeDefaults {
    fn merge_defaults(&mut self, defaults: &Self) -> Result<(), ConfigError>;
}

impl<T: Clone> MergeDefaults for Option<T> {
    fn merge_defaults(&mut self, defaults: &Self) -> Result<(), ConfigError> {
        if self.is_none() {
            self.clone_from(defaults);
        }
        Ok(())
    }
}

impl MergeDefaults for Product {
    fn merge_defaults(&mut self, defaults: &Self) -> Result<(), ConfigError> {
        self.name.merge_defaults(&defaults.name)?;
        self.link.merge_defaults(&defaults.link)?;
        self.logo.merge_defaults(&defaults.logo)?;
        self.copyright.merge_defaults(&defaults.copyright)?;
        self.trouble_text.merge_defaults(&defaults.trouble_text)
    }
}

impl MergeDefaults for EngineConfig {
    fn merge_defaults(&mut self, defaults: &Self) -> Result<(), ConfigError> {
        self.theme.merge_defaults(&defaults.theme)?;
        self.text_direction.merge_defaults(&defaults.text_direction)?;
        self.product.merge_defaults(&defaults.product)
    }
}

impl MergeDefaults for EmailContent {
    fn merge_defaults(&mut self, defaults: &Self) -> Result<(), ConfigError> {
        self.intros.merge_defaults(&defaults.intros)?;
        self.dictionary.merge_defaults(&defaults.dictionary)?;
        self.outros.merge_defaults(&defaults.outros)?;
        self.greeting.merge_defaults(&defaults.greeting)?;
        self.signature.merge_defaults(&defaults.signature)?;
        self.title.merge_defaults(&defaults.title)?;
        self.free_markdown.merge_defaults(&defaults.free_markdown)
    }
}

/// Engine-level defaulting. Idempotent.
///
/// After a successful call the theme and text direction are set, and the
/// direction is either `ltr` or `rtl`.
pub fn apply_engine_defaults(
    config: &mut EngineConfig,
    defaults: &EngineConfig,
) -> Result<(), ConfigError> {
    if let Some(direction) = defaults.text_direction.as_ref()
        && !direction.is_recognized()
    {
        return Err(ConfigError::invalid_default(
            "text_direction",
            format!("`{direction}` is neither `ltr` nor `rtl`"),
        ));
    }

    config.merge_defaults(defaults)?;

    if config.theme.is_none() {
        return Err(ConfigError::missing_default("theme"));
    }

    match config.text_direction.as_ref() {
        None => return Err(ConfigError::missing_default("text_direction")),
        Some(TextDirection::Unrecognized(value)) => {
            warn!(
                target = "domain::defaults",
                text_direction = %value,
                "unrecognized text direction, falling back to ltr"
            );
            config.text_direction = Some(TextDirection::LeftToRight);
        }
        Some(_) => {}
    }

    Ok(())
}

/// Content-level defaulting. Idempotent.
pub fn apply_content_defaults(
    content: &mut EmailContent,
    defaults: &EmailContent,
) -> Result<(), ConfigError> {
    content.merge_defaults(defaults)
}
