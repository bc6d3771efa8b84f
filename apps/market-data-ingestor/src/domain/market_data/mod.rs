//! Market Data Records
//!
//! Raw venue records as decoded from the upstream feed, and the canonical
//! records produced by the normalizer and handed to every sink.
//!
//! # Wire Format (raw aggregate)
//!
//! ```json
//! {
//!   "symbol": "AAPL",
//!   "open": 189.10,
//!   "high": 189.74,
//!   "low": 188.92,
//!   "close": 189.51,
//!   "volume": 48211,
//!   "vwap": 189.33,
//!   "timestamp": "2024-03-15T14:31:00Z"
//! }
//! ```
//!
//! # Wire Format (raw option quote)
//!
//! ```json
//! {
//!   "symbol": "O:AAPL240315C00172500",
//!   "bid": 5.50,
//!   "ask": 5.60,
//!   "bid_size": 10,
//!   "ask_size": 15,
//!   "timestamp": "2024-03-15T14:31:00.120Z"
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Sink Keys
// =============================================================================

/// Cache key prefix for equity aggregates: `equity:aggregate:{symbol}`.
pub const AGGREGATE_KEY_PREFIX: &str = "equity:aggregate:";

/// Cache key prefix for option quotes: `options:quote:{symbol}`.
pub const QUOTE_KEY_PREFIX: &str = "options:quote:";

/// How long an aggregate stays in the cache.
pub const AGGREGATE_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// How long an option quote stays in the cache.
pub const QUOTE_CACHE_TTL: Duration = Duration::from_secs(10);

// =============================================================================
// Raw Venue Records
// =============================================================================

/// Price bar exactly as the venue sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEquityAggregate {
    /// Ticker symbol (e.g., "AAPL").
    pub symbol: String,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Volume (shares).
    pub volume: i64,
    /// Volume-weighted average price.
    pub vwap: Decimal,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Top-of-book option quote exactly as the venue sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOptionQuote {
    /// Contract identifier.
    pub symbol: String,
    /// Best bid price.
    pub bid: Decimal,
    /// Best ask price.
    pub ask: Decimal,
    /// Bid size (contracts).
    pub bid_size: i64,
    /// Ask size (contracts).
    pub ask_size: i64,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Canonical Records
// =============================================================================

/// Sink-ready price bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAggregate {
    /// Ticker symbol.
    pub symbol: String,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Volume (shares).
    pub volume: i64,
    /// Volume-weighted average price.
    pub vwap: Decimal,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
}

impl CanonicalAggregate {
    /// Cache key for this aggregate.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{AGGREGATE_KEY_PREFIX}{}", self.symbol)
    }
}

/// Sink-ready option quote with derived mid and spread.
///
/// `mid` and `spread_fraction` are computed once by the normalizer and never
/// recomputed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalQuote {
    /// Contract identifier.
    pub symbol: String,
    /// Mid price, `(bid + ask) / 2`.
    pub mid: Decimal,
    /// Spread as a fraction of mid, `(ask - bid) / mid`; zero when `mid <= 0`.
    #[serde(rename = "spread_pct")]
    pub spread_fraction: Decimal,
    /// Best bid price.
    pub bid: Decimal,
    /// Best ask price.
    pub ask: Decimal,
    /// Bid size (contracts).
    pub bid_size: i64,
    /// Ask size (contracts).
    pub ask_size: i64,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
}

impl CanonicalQuote {
    /// Cache key for this quote.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{QUOTE_KEY_PREFIX}{}", self.symbol)
    }
}
