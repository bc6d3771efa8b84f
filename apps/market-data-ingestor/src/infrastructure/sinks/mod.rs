//! Sink Adapters
//!
//! Concrete implementations of the outbound ports:
//!
//! - `RedisCache`: `CacheStore` over Redis
//! - `JetStreamLog`: `EventLog` over NATS JetStream
//! - `BucketArchive`: `ArchiveSink` for an object-store bucket

pub mod archive;
pub mod nats;
pub mod redis;

pub use archive::BucketArchive;
pub use nats::JetStreamLog;
pub use self::redis::RedisCache;
