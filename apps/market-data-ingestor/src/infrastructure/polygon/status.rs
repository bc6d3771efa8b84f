//! Feed Status
//!
//! Shared, lock-light view of what the feed is doing, read by the health
//! server while the stream loop writes to it.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Connectivity mode of the active feed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Connected to the upstream venue.
    Live,
    /// Generating placeholder records locally.
    Synthetic,
}

impl FeedMode {
    /// Get the mode name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Synthetic => "synthetic",
        }
    }
}

/// Runtime state of the feed.
#[derive(Debug, Default)]
pub struct FeedStatus {
    mode: parking_lot::RwLock<Option<FeedMode>>,
    mode_since: parking_lot::RwLock<Option<DateTime<Utc>>>,
    last_fallback_reason: parking_lot::RwLock<Option<String>>,
    envelopes_received: AtomicU64,
    decode_failures: AtomicU64,
    fallbacks: AtomicU64,
}

impl FeedStatus {
    /// Create an empty status (no mode entered yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a session in `mode` became active.
    pub fn enter_mode(&self, mode: FeedMode) {
        *self.mode.write() = Some(mode);
        *self.mode_since.write() = Some(Utc::now());
    }

    /// Record a live-to-synthetic fallback and its cause.
    pub fn record_fallback(&self, reason: String) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        *self.last_fallback_reason.write() = Some(reason);
    }

    /// Increment envelopes received counter.
    pub fn increment_envelopes(&self) {
        self.envelopes_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment decode failure counter.
    pub fn increment_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Current mode, `None` before the stream starts.
    #[must_use]
    pub fn mode(&self) -> Option<FeedMode> {
        *self.mode.read()
    }

    /// When the current mode was entered.
    #[must_use]
    pub fn mode_since(&self) -> Option<DateTime<Utc>> {
        *self.mode_since.read()
    }

    /// Reason for the most recent fallback.
    #[must_use]
    pub fn last_fallback_reason(&self) -> Option<String> {
        self.last_fallback_reason.read().clone()
    }

    /// Envelopes received from the live feed.
    #[must_use]
    pub fn envelopes_received(&self) -> u64 {
        self.envelopes_received.load(Ordering::Relaxed)
    }

    /// Envelopes or payloads that failed to decode.
    #[must_use]
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Number of live-to-synthetic fallbacks.
    #[must_use]
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}
