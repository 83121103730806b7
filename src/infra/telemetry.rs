use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::{
        delivery::{METRIC_DELIVERY_FAILURES_TOTAL, METRIC_DELIVERY_TOTAL},
        render::{METRIC_RENDER_FAILURES_TOTAL, METRIC_RENDER_MS, METRIC_RENDER_TOTAL},
    },
    config::{LogFormat, LoggingSettings},
};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the crate emits. Safe to call repeatedly.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_RENDER_TOTAL,
            Unit::Count,
            "Total number of emails rendered, labelled by theme and format."
        );
        describe_counter!(
            METRIC_RENDER_FAILURES_TOTAL,
            Unit::Count,
            "Total number of failed renders, labelled by theme and format."
        );
        describe_histogram!(
            METRIC_RENDER_MS,
            Unit::Milliseconds,
            "Render latency in milliseconds, including CSS inlining or text reduction."
        );
        describe_counter!(
            METRIC_DELIVERY_TOTAL,
            Unit::Count,
            "Total number of emails handed to the SMTP relay."
        );
        describe_counter!(
            METRIC_DELIVERY_FAILURES_TOTAL,
            Unit::Count,
            "Total number of emails the SMTP relay rejected or failed to accept."
        );
    });
}
