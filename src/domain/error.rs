use thiserror::Error;

/// Failures raised while merging defaults into engine or content values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("defaults leave required field `{field}` unset")]
    MissingDefault { field: &'static str },
    #[error("invalid default for `{field}`: {reason}")]
    InvalidDefault { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn missing_default(field: &'static str) -> Self {
        Self::MissingDefault { field }
    }

    pub fn invalid_default(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidDefault {
            field,
            reason: reason.into(),
        }
    }
}
