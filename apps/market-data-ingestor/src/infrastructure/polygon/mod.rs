//! Polygon WebSocket Adapter
//!
//! Feeds equity aggregates and option quotes from the venue into the
//! registered handlers, falling back to synthetic data when the live feed
//! is unavailable.

pub mod auth;
pub mod codec;
pub mod connection;
pub mod messages;
pub mod status;
pub mod stream;
pub mod synthetic;

pub use auth::ApiKey;
pub use codec::{CodecError, EnvelopeCodec};
pub use connection::LiveSession;
pub use messages::{Envelope, EventKind, SubscriptionRequest, build_channels};
pub use status::{FeedMode, FeedStatus};
pub use stream::{
    BatchSummary, DEFAULT_DIAL_TIMEOUT, DEFAULT_SYNTHETIC_INTERVAL, DEFAULT_WS_URL, FeedConfig,
    FeedStream, StreamError,
};
pub use synthetic::SyntheticGenerator;
