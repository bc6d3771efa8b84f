//! Feed Stream
//!
//! Multiplexes the venue feed into typed handler calls.
//!
//! # Modes
//!
//! ```text
//!            run()
//!              │
//!   key set and not synthetic-only?
//!        │ yes                 │ no
//!        ▼                     ▼
//!      Live ──── failure ──► Synthetic ──► (until cancelled)
//! ```
//!
//! A run enters at most one live session. Any dial, subscribe, or read
//! failure moves it to synthetic mode for the rest of the run; there is no
//! promotion back to live.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::auth::ApiKey;
use super::codec::{CodecError, EnvelopeCodec};
use super::connection::LiveSession;
use super::messages::{Envelope, EventKind, SubscriptionRequest};
use super::status::{FeedMode, FeedStatus};
use super::synthetic::SyntheticGenerator;
use crate::application::ports::{AggregateHandler, QuoteHandler};
use crate::infrastructure::metrics;

/// Default venue endpoint.
pub const DEFAULT_WS_URL: &str = "wss://socket.polygon.io/stocks";

/// Default bound on the live handshake.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default synthetic emission cadence.
pub const DEFAULT_SYNTHETIC_INTERVAL: Duration = Duration::from_secs(5);

const MIN_SYNTHETIC_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// Error Type
// =============================================================================

/// Conditions that end a feed session.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Handshake did not complete in time.
    #[error("dial timed out after {0:?}")]
    DialTimeout(Duration),

    /// Handshake failed.
    #[error("dial failed: {0}")]
    Dial(tokio_tungstenite::tungstenite::Error),

    /// Credential cannot be sent in the handshake.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// Subscription request could not be encoded.
    #[error("subscription encode failed: {0}")]
    Encode(CodecError),

    /// Subscription request could not be sent.
    #[error("subscription send failed: {0}")]
    Subscribe(tokio_tungstenite::tungstenite::Error),

    /// Transport error while reading.
    #[error("read failed: {0}")]
    Read(tokio_tungstenite::tungstenite::Error),

    /// Peer closed the connection or the stream ended.
    #[error("connection closed")]
    Closed,

    /// The run was cancelled.
    #[error("stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// Short label used in metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DialTimeout(_) => "dial_timeout",
            Self::Dial(_) => "dial",
            Self::InvalidCredential(_) => "invalid_credential",
            Self::Encode(_) => "encode",
            Self::Subscribe(_) => "subscribe",
            Self::Read(_) => "read",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if this is the cancellation outcome.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Feed stream configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Venue endpoint.
    pub url: String,
    /// Venue credential; `None` forces synthetic mode.
    pub api_key: Option<ApiKey>,
    /// Upper-cased symbols, in subscription order.
    pub symbols: Vec<String>,
    /// Skip the live feed entirely.
    pub synthetic_only: bool,
    /// Bound on the live handshake.
    pub dial_timeout: Duration,
    /// Synthetic emission cadence.
    pub synthetic_interval: Duration,
}

impl FeedConfig {
    /// Create a configuration with default endpoint and timings.
    #[must_use]
    pub fn new(api_key: Option<ApiKey>, symbols: Vec<String>) -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            api_key,
            symbols,
            synthetic_only: false,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            synthetic_interval: DEFAULT_SYNTHETIC_INTERVAL,
        }
    }

    /// Credential to use for a live session, if live mode is allowed.
    #[must_use]
    pub const fn live_credential(&self) -> Option<&ApiKey> {
        if self.synthetic_only {
            None
        } else {
            self.api_key.as_ref()
        }
    }

    /// Mode a run starts in.
    #[must_use]
    pub const fn initial_mode(&self) -> FeedMode {
        if self.live_credential().is_some() {
            FeedMode::Live
        } else {
            FeedMode::Synthetic
        }
    }
}

// =============================================================================
// Batch Summary
// =============================================================================

/// Outcome of processing one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Envelopes found in the frame.
    pub envelopes: usize,
    /// Records delivered to a handler.
    pub dispatched: usize,
    /// Envelopes with an unrecognized tag.
    pub unknown: usize,
    /// Classified envelopes with no handler registered.
    pub unhandled: usize,
    /// Frame, envelope, or payload decode failures.
    pub decode_failures: usize,
}

// =============================================================================
// Feed Stream
// =============================================================================

/// Venue feed multiplexer.
///
/// Handlers are registered before `run`; each category holds at most one
/// handler and a later registration replaces the earlier one.
pub struct FeedStream {
    config: FeedConfig,
    codec: EnvelopeCodec,
    status: Arc<FeedStatus>,
    aggregate_handler: parking_lot::RwLock<Option<Arc<dyn AggregateHandler>>>,
    quote_handler: parking_lot::RwLock<Option<Arc<dyn QuoteHandler>>>,
}

impl std::fmt::Debug for FeedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedStream")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("has_aggregate_handler", &self.aggregate_handler.read().is_some())
            .field("has_quote_handler", &self.quote_handler.read().is_some())
            .finish_non_exhaustive()
    }
}

impl FeedStream {
    /// Create a feed stream with no handlers registered.
    #[must_use]
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            codec: EnvelopeCodec::new(),
            status: Arc::new(FeedStatus::new()),
            aggregate_handler: parking_lot::RwLock::new(None),
            quote_handler: parking_lot::RwLock::new(None),
        }
    }

    /// Shared status, for the health server.
    #[must_use]
    pub fn status(&self) -> Arc<FeedStatus> {
        Arc::clone(&self.status)
    }

    /// Stream configuration.
    #[must_use]
    pub const fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Register the aggregate handler, returning the one it replaces.
    pub fn on_aggregate(
        &self,
        handler: Arc<dyn AggregateHandler>,
    ) -> Option<Arc<dyn AggregateHandler>> {
        self.aggregate_handler.write().replace(handler)
    }

    /// Register the quote handler, returning the one it replaces.
    pub fn on_quote(&self, handler: Arc<dyn QuoteHandler>) -> Option<Arc<dyn QuoteHandler>> {
        self.quote_handler.write().replace(handler)
    }

    /// Run until cancelled.
    ///
    /// Always returns the condition that ended the stream. Live failures are
    /// absorbed by switching to synthetic mode, so in practice this is
    /// `StreamError::Cancelled`.
    pub async fn run(&self, cancel: CancellationToken) -> StreamError {
        if let Some(api_key) = self.config.live_credential() {
            let reason = self.run_live(api_key, &cancel).await;
            if reason.is_cancelled() {
                return reason;
            }

            tracing::error!(
                error = %reason,
                reason = reason.kind(),
                "Live feed failed, falling back to synthetic data"
            );
            self.status.record_fallback(reason.to_string());
            metrics::record_fallback(reason.kind());
        } else if self.config.synthetic_only {
            tracing::info!("Synthetic-only mode requested");
        } else {
            tracing::warn!("No API key configured, using synthetic data");
        }

        self.run_synthetic(&cancel).await
    }

    async fn run_live(&self, api_key: &ApiKey, cancel: &CancellationToken) -> StreamError {
        tracing::info!(
            url = %self.config.url,
            symbols = ?self.config.symbols,
            "Connecting to live feed"
        );

        let dial = LiveSession::connect(&self.config.url, api_key, self.config.dial_timeout);
        let mut session = tokio::select! {
            biased;
            () = cancel.cancelled() => return StreamError::Cancelled,
            result = dial => match result {
                Ok(session) => session,
                Err(e) => return e,
            },
        };

        let request = SubscriptionRequest::for_symbols(&self.config.symbols);
        let subscribed = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(StreamError::Cancelled),
            result = session.subscribe(&self.codec, &request) => result,
        };
        if let Err(e) = subscribed {
            session.close().await;
            return e;
        }

        self.status.enter_mode(FeedMode::Live);
        metrics::set_feed_mode(FeedMode::Live);
        tracing::info!(
            session_id = %session.id(),
            channels = ?request.params,
            "Live feed subscribed"
        );

        let reason = loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => break StreamError::Cancelled,
                frame = session.read_frame() => frame,
            };

            match frame {
                Ok(Some(text)) => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break StreamError::Cancelled,
                        _ = self.process_frame(&text) => {}
                    }
                }
                Ok(None) => {}
                Err(e) => break e,
            }
        };

        tracing::info!(session_id = %session.id(), reason = reason.kind(), "Live session ended");
        session.close().await;
        reason
    }

    async fn run_synthetic(&self, cancel: &CancellationToken) -> StreamError {
        let session_id = Uuid::new_v4();
        let interval = self.config.synthetic_interval.max(MIN_SYNTHETIC_INTERVAL);
        let generator = SyntheticGenerator::new(self.config.symbols.clone());

        self.status.enter_mode(FeedMode::Synthetic);
        metrics::set_feed_mode(FeedMode::Synthetic);
        tracing::warn!(
            %session_id,
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            symbols = ?generator.symbols(),
            "Emitting synthetic market data"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.emit_synthetic(&generator) => {}
            }
        }

        tracing::info!(%session_id, "Synthetic session cancelled");
        StreamError::Cancelled
    }

    async fn emit_synthetic(&self, generator: &SyntheticGenerator) {
        let aggregate_handler = self.aggregate_handler.read().clone();
        let quote_handler = self.quote_handler.read().clone();
        let mut emitted: u64 = 0;

        for (aggregate, quote) in generator.tick(Utc::now()) {
            if let Some(handler) = &aggregate_handler {
                handler.on_aggregate(aggregate).await;
                emitted += 1;
            }
            if let Some(handler) = &quote_handler {
                handler.on_quote(quote).await;
                emitted += 1;
            }
        }

        metrics::record_synthetic_records(emitted);
    }

    /// Decode one text frame and dispatch every envelope in it.
    ///
    /// Failures are logged and counted; one bad envelope never prevents the
    /// rest of the batch from being delivered. Inside `run` the batch is
    /// abandoned if the run is cancelled while a handler is still pending.
    pub async fn process_frame(&self, text: &str) -> BatchSummary {
        let mut summary = BatchSummary::default();

        let values = match self.codec.decode_frame(text) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable frame");
                self.record_decode_failure("frame", &mut summary);
                return summary;
            }
        };

        for value in values {
            summary.envelopes += 1;
            self.status.increment_envelopes();

            match self.codec.decode_envelope(value) {
                Ok(envelope) => self.dispatch(envelope, &mut summary).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed envelope");
                    self.record_decode_failure("envelope", &mut summary);
                }
            }
        }

        summary
    }

    async fn dispatch(&self, envelope: Envelope, summary: &mut BatchSummary) {
        metrics::record_envelope_received(envelope.kind);

        match envelope.kind {
            EventKind::Aggregate => {
                let Some(handler) = self.aggregate_handler.read().clone() else {
                    summary.unhandled += 1;
                    return;
                };
                match self.codec.decode_aggregate(envelope.data) {
                    Ok(aggregate) => {
                        handler.on_aggregate(aggregate).await;
                        summary.dispatched += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, tag = %envelope.tag, "Failed to decode aggregate");
                        self.record_decode_failure("aggregate", summary);
                    }
                }
            }
            EventKind::Quote => {
                let Some(handler) = self.quote_handler.read().clone() else {
                    summary.unhandled += 1;
                    return;
                };
                match self.codec.decode_quote(envelope.data) {
                    Ok(quote) => {
                        handler.on_quote(quote).await;
                        summary.dispatched += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, tag = %envelope.tag, "Failed to decode quote");
                        self.record_decode_failure("quote", summary);
                    }
                }
            }
            EventKind::Unknown => {
                tracing::debug!(tag = %envelope.tag, "Ignoring unknown event");
                summary.unknown += 1;
            }
        }
    }

    fn record_decode_failure(&self, stage: &'static str, summary: &mut BatchSummary) {
        summary.decode_failures += 1;
        self.status.increment_decode_failures();
        metrics::record_decode_failure(stage);
    }
}

// =============================================================================
// Tests
// =============================================================================
