use std::{process, sync::Arc};

use mailsmith::{
    application::{
        delivery::{Mailer, SendOptions, SmtpMailTransport, validate},
        error::AppError,
        generate::{GenerateError, generate_all, send_all},
        render::{Html2TextReducer, Renderer, ThemeRegistry},
    },
    config::{self, Command, SelectionArgs, Settings},
    infra::{artifacts::ArtifactStore, telemetry},
    samples::{self, Sample},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, causes = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, causes = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    let command = cli_args.command.unwrap_or_default();

    telemetry::init(&settings.logging)?;

    let registry = select_themes(command.selection())?;
    let samples = select_samples(command.selection()).await?;
    let store = ArtifactStore::new(&settings.output.directory);

    match command {
        Command::Generate(_) => run_generate(&settings, &registry, &samples, &store).await,
        Command::Send(_) => run_send(&settings, &registry, &samples, &store).await,
    }
}

async fn run_generate(
    settings: &Settings,
    registry: &ThemeRegistry,
    samples: &[Sample],
    store: &ArtifactStore,
) -> Result<(), AppError> {
    let renderer =
        Renderer::new().with_reducer(Arc::new(Html2TextReducer::new(settings.render.text_width)));
    let generated = generate_all(
        &renderer,
        &settings.engine_config(),
        registry,
        samples,
        store,
    )
    .await?;

    info!(
        emails = generated.len(),
        directory = %store.root().display(),
        "Generation finished"
    );
    Ok(())
}

async fn run_send(
    settings: &Settings,
    registry: &ThemeRegistry,
    samples: &[Sample],
    store: &ArtifactStore,
) -> Result<(), AppError> {
    let options = SendOptions {
        recipients: settings.delivery.recipients.clone(),
        subject: settings.delivery.subject_prefix.clone(),
    };
    validate(&settings.smtp, &options).map_err(GenerateError::from)?;

    let mailer = Mailer::new(SmtpMailTransport::from_settings(&settings.smtp)?);
    let sent = send_all(&mailer, &settings.smtp, &options, registry, samples, store).await?;

    info!(emails = sent, "Delivery finished");
    Ok(())
}

fn select_themes(selection: &SelectionArgs) -> Result<ThemeRegistry, AppError> {
    ThemeRegistry::builtin()
        .select(selection.themes.as_slice())
        .map_err(AppError::UnknownThemes)
}

async fn select_samples(selection: &SelectionArgs) -> Result<Vec<Sample>, AppError> {
    if selection.content.is_empty() {
        return Ok(samples::builtin()?);
    }

    let mut loaded = Vec::with_capacity(selection.content.len());
    for path in &selection.content {
        loaded.push(samples::load(path).await?);
    }
    Ok(loaded)
}
