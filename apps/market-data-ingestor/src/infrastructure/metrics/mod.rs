//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Feed**: envelopes received by kind, decode failures, unknown events
//! - **Mode**: current feed mode, live-to-synthetic fallbacks by reason
//! - **Sinks**: write failures and latency per sink and record kind
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::infrastructure::polygon::{EventKind, FeedMode};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Calling this again returns the handle installed by the first call.
///
/// # Errors
///
/// Returns an error if the global recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Feed counters
    describe_counter!(
        "ingestor_envelopes_received_total",
        "Total envelopes received from the live feed by event kind"
    );
    describe_counter!(
        "ingestor_decode_failures_total",
        "Total frames, envelopes, or payloads that failed to decode"
    );
    describe_counter!(
        "ingestor_synthetic_records_total",
        "Total synthetic records emitted"
    );

    // Mode
    describe_gauge!(
        "ingestor_feed_mode",
        "Current feed mode (1 for the active mode label)"
    );
    describe_counter!(
        "ingestor_fallbacks_total",
        "Total live-to-synthetic fallbacks by reason"
    );

    // Sinks
    describe_counter!(
        "ingestor_sink_failures_total",
        "Total sink write failures by sink and record kind"
    );
    describe_histogram!(
        "ingestor_sink_write_seconds",
        "Time spent writing one record to a sink"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Low-latency cache.
    Cache,
    /// Durable event log.
    Log,
    /// Cold-storage archive.
    Archive,
}

impl SinkKind {
    /// Get the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Log => "log",
            Self::Archive => "archive",
        }
    }
}

/// Metric labels for record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Equity aggregate.
    Aggregate,
    /// Option quote.
    Quote,
}

impl RecordKind {
    /// Get the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::Quote => "quote",
        }
    }
}

/// Record an envelope received from the live feed.
pub fn record_envelope_received(kind: EventKind) {
    counter!(
        "ingestor_envelopes_received_total",
        "event_kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a decode failure at `stage` (`frame`, `envelope`, or a record kind).
pub fn record_decode_failure(stage: &'static str) {
    counter!(
        "ingestor_decode_failures_total",
        "stage" => stage
    )
    .increment(1);
}

/// Record synthetic records emitted in one tick.
pub fn record_synthetic_records(count: u64) {
    counter!("ingestor_synthetic_records_total").increment(count);
}

/// Mark `mode` as the active feed mode.
pub fn set_feed_mode(mode: FeedMode) {
    for candidate in [FeedMode::Live, FeedMode::Synthetic] {
        let value = if candidate == mode { 1.0 } else { 0.0 };
        gauge!("ingestor_feed_mode", "mode" => candidate.as_str()).set(value);
    }
}

/// Record a live-to-synthetic fallback.
pub fn record_fallback(reason: &'static str) {
    counter!(
        "ingestor_fallbacks_total",
        "reason" => reason
    )
    .increment(1);
}

/// Record a failed sink write.
pub fn record_sink_failure(sink: SinkKind, record: RecordKind) {
    counter!(
        "ingestor_sink_failures_total",
        "sink" => sink.as_str(),
        "record_kind" => record.as_str()
    )
    .increment(1);
}

/// Record how long a sink write took.
pub fn record_sink_duration(sink: SinkKind, record: RecordKind, duration: Duration) {
    histogram!(
        "ingestor_sink_write_seconds",
        "sink" => sink.as_str(),
        "record_kind" => record.as_str()
    )
    .record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
