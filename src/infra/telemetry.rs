use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

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

/// Register descriptions for the cache counters with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "qoptions_cache_hit_total",
            Unit::Count,
            "Total number of language-qualified cache hits."
        );
        describe_counter!(
            "qoptions_cache_miss_total",
            Unit::Count,
            "Total number of language-qualified cache misses."
        );
        describe_counter!(
            "qoptions_cache_set_total",
            Unit::Count,
            "Total number of values written to the lookup cache."
        );
        describe_counter!(
            "qoptions_cache_invalidation_total",
            Unit::Count,
            "Total number of all-language invalidations requested."
        );
        describe_counter!(
            "qoptions_cache_invalidation_partial_total",
            Unit::Count,
            "Total number of invalidations that left stale entries behind."
        );
        describe_counter!(
            "qoptions_cache_lru_evict_total",
            Unit::Count,
            "Total number of LRU store evictions due to capacity."
        );
    });
}
