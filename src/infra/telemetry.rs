use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::articles::METRIC_CACHE_ERROR_TOTAL;
use crate::application::background::{
    METRIC_TASK_DROPPED_TOTAL, METRIC_TASK_FAILED_TOTAL, METRIC_TASK_TIMEOUT_TOTAL,
};
use crate::cache::{METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL};
use crate::config::{LogFormat, LoggingSettings};

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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of article cache hits, by key space."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of article cache misses, by key space."
        );
        describe_counter!(
            METRIC_CACHE_ERROR_TOTAL,
            Unit::Count,
            "Total number of cache failures absorbed by the article repository."
        );
        describe_counter!(
            METRIC_TASK_FAILED_TOTAL,
            Unit::Count,
            "Total number of background tasks that returned an error."
        );
        describe_counter!(
            METRIC_TASK_TIMEOUT_TOTAL,
            Unit::Count,
            "Total number of background tasks cancelled by their deadline."
        );
        describe_counter!(
            METRIC_TASK_DROPPED_TOTAL,
            Unit::Count,
            "Total number of background tasks dropped before they started."
        );
    });
}
