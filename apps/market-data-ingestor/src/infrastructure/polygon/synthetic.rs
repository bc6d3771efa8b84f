//! Synthetic Generator
//!
//! Deterministic placeholder records used when the live feed is unavailable.
//! Values are fixed so downstream services see a stable, recognizable pattern;
//! only the timestamp moves.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::market_data::{RawEquityAggregate, RawOptionQuote};

/// Contract suffix appended to each symbol for synthetic option quotes.
pub const SYNTHETIC_CONTRACT_SUFFIX: &str = " 2025-01-17 150C";

/// Produces one aggregate and one quote per configured symbol.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    symbols: Vec<String>,
}

impl SyntheticGenerator {
    /// Create a generator for `symbols`.
    #[must_use]
    pub const fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    /// Symbols this generator emits for.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Records for one tick, in symbol order, aggregate before quote.
    pub fn tick(
        &self,
        at: DateTime<Utc>,
    ) -> impl Iterator<Item = (RawEquityAggregate, RawOptionQuote)> + '_ {
        self.symbols
            .iter()
            .map(move |symbol| (aggregate(symbol, at), quote(symbol, at)))
    }
}

/// Placeholder aggregate for `symbol`.
#[must_use]
pub fn aggregate(symbol: &str, at: DateTime<Utc>) -> RawEquityAggregate {
    RawEquityAggregate {
        symbol: symbol.to_string(),
        open: Decimal::new(100, 0),
        high: Decimal::new(102, 0),
        low: Decimal::new(99, 0),
        close: Decimal::new(101, 0),
        volume: 1000,
        vwap: Decimal::new(1005, 1),
        timestamp: at,
    }
}

/// Placeholder option quote on a contract of `symbol`.
#[must_use]
pub fn quote(symbol: &str, at: DateTime<Utc>) -> RawOptionQuote {
    RawOptionQuote {
        symbol: format!("{symbol}{SYNTHETIC_CONTRACT_SUFFIX}"),
        bid: Decimal::new(12, 1),
        ask: Decimal::new(14, 1),
        bid_size: 10,
        ask_size: 12,
        timestamp: at,
    }
}
