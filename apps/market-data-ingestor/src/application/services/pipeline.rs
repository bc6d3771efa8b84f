//! Ingestion Pipeline
//!
//! Normalizes each record and writes it to every sink. Sink writes for one
//! record run concurrently and fail independently; failures are logged and
//! counted, never returned to the feed. Each write is bounded by the write
//! timeout, so a stalled sink delays a record by at most that long.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::application::ports::{
    AggregateHandler, ArchiveSink, CacheStore, EventLog, QuoteHandler, SinkError,
};
use crate::domain::market_data::{
    AGGREGATE_CACHE_TTL, QUOTE_CACHE_TTL, RawEquityAggregate, RawOptionQuote,
};
use crate::domain::normalizer::{normalize_aggregate, normalize_quote};
use crate::infrastructure::metrics::{self, RecordKind, SinkKind};

/// Default bound on a single sink write.
pub const DEFAULT_SINK_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fans normalized records out to the cache, event log, and archive.
#[derive(Clone)]
pub struct IngestionPipeline {
    cache: Arc<dyn CacheStore>,
    log: Arc<dyn EventLog>,
    archive: Arc<dyn ArchiveSink>,
    write_timeout: Duration,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Create a pipeline over the given sinks.
    #[must_use]
    pub fn new(
        cache: Arc<dyn CacheStore>,
        log: Arc<dyn EventLog>,
        archive: Arc<dyn ArchiveSink>,
    ) -> Self {
        Self {
            cache,
            log,
            archive,
            write_timeout: DEFAULT_SINK_WRITE_TIMEOUT,
        }
    }

    /// Bound each sink write by `limit` instead of the default.
    #[must_use]
    pub fn with_write_timeout(mut self, limit: Duration) -> Self {
        self.write_timeout = limit;
        self
    }

    /// Bound applied to each sink write.
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Normalize an aggregate and write it to cache, log, and archive.
    pub async fn handle_aggregate(&self, raw: RawEquityAggregate) {
        let canonical = normalize_aggregate(&raw);
        let payload = match serde_json::to_vec(&canonical) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(symbol = %canonical.symbol, error = %e, "Failed to serialize aggregate");
                return;
            }
        };
        let key = canonical.cache_key();
        let symbol = canonical.symbol.as_str();
        let kind = RecordKind::Aggregate;

        let limit = self.write_timeout;
        let (cached, logged, archived) = tokio::join!(
            timed(
                SinkKind::Cache,
                kind,
                limit,
                self.cache.store(&key, &payload, AGGREGATE_CACHE_TTL),
            ),
            timed(SinkKind::Log, kind, limit, self.log.append(symbol, &payload)),
            timed(SinkKind::Archive, kind, limit, self.archive.store(symbol, &payload)),
        );

        report(SinkKind::Cache, kind, symbol, cached);
        report(SinkKind::Log, kind, symbol, logged);
        report(SinkKind::Archive, kind, symbol, archived);
    }

    /// Normalize a quote and write it to cache and log.
    pub async fn handle_quote(&self, raw: RawOptionQuote) {
        let canonical = normalize_quote(&raw);
        let payload = match serde_json::to_vec(&canonical) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(symbol = %canonical.symbol, error = %e, "Failed to serialize quote");
                return;
            }
        };
        let key = canonical.cache_key();
        let symbol = canonical.symbol.as_str();
        let kind = RecordKind::Quote;

        let limit = self.write_timeout;
        let (cached, logged) = tokio::join!(
            timed(
                SinkKind::Cache,
                kind,
                limit,
                self.cache.store(&key, &payload, QUOTE_CACHE_TTL),
            ),
            timed(SinkKind::Log, kind, limit, self.log.append(symbol, &payload)),
        );

        report(SinkKind::Cache, kind, symbol, cached);
        report(SinkKind::Log, kind, symbol, logged);
    }
}

async fn timed<F>(
    sink: SinkKind,
    record: RecordKind,
    limit: Duration,
    write: F,
) -> Result<(), SinkError>
where
    F: Future<Output = Result<(), SinkError>>,
{
    let started = Instant::now();
    let result = tokio::time::timeout(limit, write)
        .await
        .unwrap_or(Err(SinkError::Timeout(limit)));
    metrics::record_sink_duration(sink, record, started.elapsed());
    result
}

fn report(sink: SinkKind, record: RecordKind, symbol: &str, result: Result<(), SinkError>) {
    let Err(e) = result else {
        return;
    };

    metrics::record_sink_failure(sink, record);
    match sink {
        SinkKind::Log => tracing::error!(
            sink = sink.as_str(),
            record_kind = record.as_str(),
            symbol,
            error = %e,
            "Event log write failed"
        ),
        SinkKind::Cache | SinkKind::Archive => tracing::warn!(
            sink = sink.as_str(),
            record_kind = record.as_str(),
            symbol,
            error = %e,
            "Sink write failed"
        ),
    }
}

#[async_trait]
impl AggregateHandler for IngestionPipeline {
    async fn on_aggregate(&self, aggregate: RawEquityAggregate) {
        self.handle_aggregate(aggregate).await;
    }
}

#[async_trait]
impl QuoteHandler for IngestionPipeline {
    async fn on_quote(&self, quote: RawOptionQuote) {
        self.handle_quote(quote).await;
    }
}
