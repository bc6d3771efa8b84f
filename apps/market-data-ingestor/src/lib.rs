#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Market Data Ingestor
//!
//! Streams equity aggregates and option quotes from a Polygon-style
//! WebSocket feed, normalizes them, and fans each record out to a cache,
//! a durable event log, and a cold-storage archive. When the live feed is
//! unavailable the service keeps downstream consumers warm with synthetic
//! records.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Record types and normalization
//!   - `market_data`: Raw and canonical records, cache keys and TTLs
//!   - `normalizer`: Raw-to-canonical transform (mid, spread)
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Sink and feed handler interfaces
//!   - `services`: Ingestion pipeline fan-out
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `polygon`: Feed stream, live session, synthetic generator
//!   - `sinks`: Redis cache, NATS JetStream log, bucket archive
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//!                                         ┌──► Cache (Redis)
//! Polygon WS ──► FeedStream ──► Pipeline ─┼──► Event log (JetStream)
//!  (or synthetic)   decode      normalize └──► Archive (bucket)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Records and normalization with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::market_data::{
    CanonicalAggregate, CanonicalQuote, RawEquityAggregate, RawOptionQuote,
};
pub use domain::normalizer::{normalize_aggregate, normalize_quote};

// Ports and services
pub use application::ports::{
    AggregateHandler, ArchiveSink, CacheStore, EventLog, QuoteHandler, SinkError,
};
pub use application::services::IngestionPipeline;

// Feed
pub use infrastructure::polygon::{
    ApiKey, BatchSummary, FeedConfig, FeedMode, FeedStatus, FeedStream, StreamError,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, IngestorConfig, ServerSettings, SinkSettings};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::{
    RecordKind as MetricsRecordKind, SinkKind as MetricsSinkKind, init_metrics,
};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
