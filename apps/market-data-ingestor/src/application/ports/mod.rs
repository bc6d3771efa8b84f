//! Port Interfaces
//!
//! Defines the interfaces (ports) between the feed, the pipeline, and the
//! sinks, following the Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - `CacheStore`: low-latency key/value cache with TTL
//! - `EventLog`: durable, keyed append-only log
//! - `ArchiveSink`: cold-storage archive
//!
//! ## Driver Ports (Inbound)
//!
//! - `AggregateHandler` / `QuoteHandler`: callbacks the feed invokes for
//!   each decoded record

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::market_data::{RawEquityAggregate, RawOptionQuote};

// =============================================================================
// Sink Errors
// =============================================================================

/// Errors returned by sink adapters.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Record could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cache write failed.
    #[error("cache store failed: {0}")]
    Cache(String),

    /// Event log append failed.
    #[error("event log append failed: {0}")]
    Log(String),

    /// Archive write failed.
    #[error("archive store failed: {0}")]
    Archive(String),

    /// Sink connection could not be established.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// Write did not complete within the pipeline's bound.
    #[error("sink write timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// Driven Ports
// =============================================================================

/// Low-latency cache holding the latest record per key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    async fn store(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), SinkError>;
}

/// Durable append-only log. Records with the same key keep their order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append `value` with partition key `key`.
    async fn append(&self, key: &str, value: &[u8]) -> Result<(), SinkError>;
}

/// Cold-storage archive.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    /// Archive `value` under `key`.
    async fn store(&self, key: &str, value: &[u8]) -> Result<(), SinkError>;
}

// =============================================================================
// Driver Ports
// =============================================================================

/// Receives every decoded equity aggregate.
///
/// Implemented for any `Fn(RawEquityAggregate) -> impl Future<Output = ()>`.
#[async_trait]
pub trait AggregateHandler: Send + Sync {
    /// Handle one aggregate. Failures must be absorbed by the handler.
    async fn on_aggregate(&self, aggregate: RawEquityAggregate);
}

/// Receives every decoded option quote.
///
/// Implemented for any `Fn(RawOptionQuote) -> impl Future<Output = ()>`.
#[async_trait]
pub trait QuoteHandler: Send + Sync {
    /// Handle one quote. Failures must be absorbed by the handler.
    async fn on_quote(&self, quote: RawOptionQuote);
}

#[async_trait]
impl<F, Fut> AggregateHandler for F
where
    F: Fn(RawEquityAggregate) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_aggregate(&self, aggregate: RawEquityAggregate) {
        self(aggregate).await;
    }
}

#[async_trait]
impl<F, Fut> QuoteHandler for F
where
    F: Fn(RawOptionQuote) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_quote(&self, quote: RawOptionQuote) {
        self(quote).await;
    }
}
