//! Normalizer
//!
//! Pure conversion from raw venue records to canonical records. No state,
//! no I/O, no error conditions: upstream data is trusted, so zero or negative
//! prices pass straight through.

use rust_decimal::Decimal;

use super::market_data::{
    CanonicalAggregate, CanonicalQuote, RawEquityAggregate, RawOptionQuote,
};

/// Copy a raw aggregate into its canonical shape.
#[must_use]
pub fn normalize_aggregate(raw: &RawEquityAggregate) -> CanonicalAggregate {
    CanonicalAggregate {
        symbol: raw.symbol.clone(),
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: raw.volume,
        vwap: raw.vwap,
        timestamp: raw.timestamp,
    }
}

/// Convert a raw option quote, deriving mid price and spread fraction.
#[must_use]
pub fn normalize_quote(raw: &RawOptionQuote) -> CanonicalQuote {
    let mid = mid_price(raw.bid, raw.ask);

    CanonicalQuote {
        symbol: raw.symbol.clone(),
        mid,
        spread_fraction: spread_fraction(raw.bid, raw.ask, mid),
        bid: raw.bid,
        ask: raw.ask,
        bid_size: raw.bid_size,
        ask_size: raw.ask_size,
        timestamp: raw.timestamp,
    }
}

/// `(bid + ask) / 2`, halving first when the sum would overflow.
fn mid_price(bid: Decimal, ask: Decimal) -> Decimal {
    bid.checked_add(ask)
        .map_or_else(|| bid / Decimal::TWO + ask / Decimal::TWO, |sum| sum / Decimal::TWO)
}

/// `(ask - bid) / mid`, or zero when `mid <= 0` or the arithmetic overflows.
fn spread_fraction(bid: Decimal, ask: Decimal, mid: Decimal) -> Decimal {
    if mid <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    ask.checked_sub(bid)
        .and_then(|spread| spread.checked_div(mid))
        .unwrap_or(Decimal::ZERO)
}
