use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{delivery::DeliveryError, generate::GenerateError},
    config::LoadError,
    infra::error::InfraError,
    samples::SampleError,
};

/// Error message plus the chain of underlying causes, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Content(#[from] SampleError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("unknown theme: {}", .0.join(", "))]
    UnknownThemes(Vec<String>),
}

impl AppError {
    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::delivery::DeliveryConfigError;

    #[test]
    fn report_walks_the_source_chain() {
        let error = AppError::from(GenerateError::Settings(DeliveryConfigError::NoRecipients));

        let report = error.report();

        assert_eq!(
            report.messages,
            [
                "delivery is not configured: at least one recipient is required",
                "at least one recipient is required",
            ]
        );
    }

    #[test]
    fn unknown_themes_are_listed() {
        let error = AppError::UnknownThemes(vec!["dark".to_string(), "neon".to_string()]);
        assert_eq!(error.to_string(), "unknown theme: dark, neon");
    }
}
