//! Polygon WebSocket Message Types
//!
//! Wire format types for the upstream venue feed.
//!
//! # Inbound
//!
//! Every text frame is a JSON array of envelopes. An envelope carries an
//! event tag and an opaque payload that is only decoded after the tag has
//! been classified:
//!
//! ```json
//! [
//!   {"ev": "A", "data": {"symbol": "AAPL", "open": 189.1, ...}},
//!   {"ev": "Q", "data": {"symbol": "O:AAPL240315C00172500", "bid": 5.5, ...}}
//! ]
//! ```
//!
//! # Outbound
//!
//! A single subscription request sent right after the handshake:
//!
//! ```json
//! {"action": "subscribe", "params": ["A.AAPL", "Q.AAPL"]}
//! ```

use serde::{Deserialize, Serialize};

/// Channel subscribed when no symbols are configured.
pub const WILDCARD_TRADE_CHANNEL: &str = "T.*";

// =============================================================================
// Event Classification
// =============================================================================

/// Closed set of event categories the feed understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Equity price aggregate (`A`).
    Aggregate,
    /// Option quote (`Q`, or `T` which carries the same payload shape).
    Quote,
    /// Any other tag. Dropped after a debug log.
    Unknown,
}

impl EventKind {
    /// Classify an envelope tag.
    #[must_use]
    pub fn classify(tag: &str) -> Self {
        match tag {
            "A" => Self::Aggregate,
            "Q" | "T" => Self::Quote,
            _ => Self::Unknown,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::Quote => "quote",
            Self::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Inbound Envelope
// =============================================================================

/// One envelope as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEnvelope {
    /// Event tag (`ev`, also accepted as `event_type`).
    #[serde(rename = "ev", alias = "event_type", default)]
    pub event: String,

    /// Opaque payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// An envelope whose tag has been classified but whose payload is still
/// undecoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Classified event category.
    pub kind: EventKind,
    /// Original tag, kept for logging unknown events.
    pub tag: String,
    /// Undecoded payload.
    pub data: serde_json::Value,
}

impl From<RawEnvelope> for Envelope {
    fn from(raw: RawEnvelope) -> Self {
        Self {
            kind: EventKind::classify(&raw.event),
            tag: raw.event,
            data: raw.data,
        }
    }
}

// =============================================================================
// Outbound Messages (Client -> Server)
// =============================================================================

/// Subscription request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest {
    /// Action: "subscribe".
    pub action: &'static str,

    /// Channels, e.g. `A.AAPL`.
    pub params: Vec<String>,
}

impl SubscriptionRequest {
    /// Create a subscribe request for explicit channels.
    #[must_use]
    pub const fn subscribe(params: Vec<String>) -> Self {
        Self {
            action: "subscribe",
            params,
        }
    }

    /// Create the subscribe request for a symbol set.
    #[must_use]
    pub fn for_symbols(symbols: &[String]) -> Self {
        Self::subscribe(build_channels(symbols))
    }
}

/// Build channel names for a symbol set.
///
/// Each symbol contributes an aggregate channel and a quote channel, in input
/// order. An empty set subscribes to the wildcard trade channel instead.
#[must_use]
pub fn build_channels(symbols: &[String]) -> Vec<String> {
    if symbols.is_empty() {
        return vec![WILDCARD_TRADE_CHANNEL.to_string()];
    }

    symbols
        .iter()
        .flat_map(|symbol| [format!("A.{symbol}"), format!("Q.{symbol}")])
        .collect()
}
