use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::fetcher::{
    METRIC_FETCH_COALESCED, METRIC_FETCH_FAILURE, METRIC_FETCH_MS, METRIC_FETCH_TOTAL,
};
use crate::application::viewer::{METRIC_PAGE_REDIRECT, METRIC_STALE_DISCARD};
use crate::cache::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so that command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
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
            METRIC_FETCH_TOTAL,
            Unit::Count,
            "Total number of audit log page requests sent to the host."
        );
        describe_counter!(
            METRIC_FETCH_COALESCED,
            Unit::Count,
            "Total number of fetches that joined an identical in-flight request."
        );
        describe_counter!(
            METRIC_FETCH_FAILURE,
            Unit::Count,
            "Total number of failed audit log page requests, by failure kind."
        );
        describe_histogram!(
            METRIC_FETCH_MS,
            Unit::Milliseconds,
            "Audit log page request latency in milliseconds."
        );
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of audit log pages served from the page store."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of page store lookups that missed."
        );
        describe_counter!(
            METRIC_CACHE_EVICT,
            Unit::Count,
            "Total number of pages evicted from the page store due to capacity."
        );
        describe_counter!(
            METRIC_STALE_DISCARD,
            Unit::Count,
            "Total number of results discarded because a newer request was submitted."
        );
        describe_counter!(
            METRIC_PAGE_REDIRECT,
            Unit::Count,
            "Total number of out-of-range page requests corrected to the last page."
        );
    });
}
