//! Batch generation of every (theme, sample) pair and delivery of the results.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, instrument};

use crate::{
    application::{
        delivery::{
            DeliveryConfigError, DeliveryError, MailTransport, Mailer, SendOptions, SmtpSettings,
            validate,
        },
        render::{RenderError, Renderer, ThemeRegistry},
    },
    domain::engine::EngineConfig,
    infra::artifacts::{ArtifactError, ArtifactStore},
    samples::Sample,
};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to render `{sample}` with theme `{theme}`: {source}")]
    Render {
        theme: String,
        sample: String,
        #[source]
        source: RenderError,
    },
    #[error("failed to store `{sample}` for theme `{theme}`: {source}")]
    Artifact {
        theme: String,
        sample: String,
        #[source]
        source: ArtifactError,
    },
    #[error("failed to send `{sample}` for theme `{theme}`: {source}")]
    Delivery {
        theme: String,
        sample: String,
        #[source]
        source: DeliveryError,
    },
    #[error("delivery is not configured: {0}")]
    Settings(#[from] DeliveryConfigError),
}

/// One rendered pair and where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEmail {
    pub theme: String,
    pub sample: String,
    pub html_path: PathBuf,
    pub text_path: PathBuf,
}

/// Render every sample with every theme and write both bodies to `store`.
///
/// Each pair renders from its own copy of `base_config` and of the sample
/// content. The first failure stops the batch.
#[instrument(skip_all, fields(themes = registry.len(), samples = samples.len()))]
pub async fn generate_all(
    renderer: &Renderer,
    base_config: &EngineConfig,
    registry: &ThemeRegistry,
    samples: &[Sample],
    store: &ArtifactStore,
) -> Result<Vec<GeneratedEmail>, GenerateError> {
    let mut generated = Vec::with_capacity(registry.len() * samples.len());
    for theme in registry.iter() {
        for sample in samples {
            let mut config = base_config.clone().with_theme(theme.clone());
            let mut content = sample.content.clone();

            let email = renderer
                .render(&mut config, &mut content)
                .map_err(|source| GenerateError::Render {
                    theme: theme.name().to_string(),
                    sample: sample.name.clone(),
                    source,
                })?;

            let [html_path, text_path] = store
                .write_email(theme.name(), &sample.name, &email)
                .await
                .map_err(|source| GenerateError::Artifact {
                    theme: theme.name().to_string(),
                    sample: sample.name.clone(),
                    source,
                })?;

            info!(
                target = "application::generate",
                theme = theme.name(),
                sample = %sample.name,
                path = %html_path.display(),
                "Email generated"
            );
            generated.push(GeneratedEmail {
                theme: theme.name().to_string(),
                sample: sample.name.clone(),
                html_path,
                text_path,
            });
        }
    }

    Ok(generated)
}

/// Subject line used when sending a generated pair.
pub fn subject_for(prefix: &str, theme: &str, sample: &str) -> String {
    format!("{prefix} | {theme} | {sample}")
}

/// Send previously generated emails for every (theme, sample) pair.
///
/// `options_template.subject` is the subject prefix. Settings are validated
/// once before any artifact is read.
#[instrument(skip_all, fields(themes = registry.len(), samples = samples.len()))]
pub async fn send_all<T: MailTransport>(
    mailer: &Mailer<T>,
    settings: &SmtpSettings,
    options_template: &SendOptions,
    registry: &ThemeRegistry,
    samples: &[Sample],
    store: &ArtifactStore,
) -> Result<usize, GenerateError> {
    validate(settings, options_template)?;

    let mut sent = 0;
    for theme in registry.iter() {
        for sample in samples {
            let email = store
                .read_email(theme.name(), &sample.name)
                .await
                .map_err(|source| GenerateError::Artifact {
                    theme: theme.name().to_string(),
                    sample: sample.name.clone(),
                    source,
                })?;

            let options = SendOptions {
                recipients: options_template.recipients.clone(),
                subject: subject_for(&options_template.subject, theme.name(), &sample.name),
            };
            info!(
                target = "application::generate",
                subject = %options.subject,
                "Sending email"
            );

            mailer
                .send(settings, &options, &email)
                .await
                .map_err(|source| GenerateError::Delivery {
                    theme: theme.name().to_string(),
                    sample: sample.name.clone(),
                    source,
                })?;
            sent += 1;
        }
    }

    Ok(sent)
}
