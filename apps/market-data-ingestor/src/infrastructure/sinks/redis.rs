//! Redis cache adapter.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, AsyncConnectionConfig};
use tokio::sync::OnceCell;

use crate::application::ports::{CacheStore, SinkError};
use crate::application::services::DEFAULT_SINK_WRITE_TIMEOUT;

/// Latest-value cache backed by Redis `SET … EX`.
///
/// The multiplexed connection is opened on first use and shared by every
/// subsequent write. A failed connect is retried on the next write. Both the
/// connect and each response are bounded by the I/O timeout.
pub struct RedisCache {
    client: redis::Client,
    io_timeout: Duration,
    connection: OnceCell<MultiplexedConnection>,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("io_timeout", &self.io_timeout)
            .field("connected", &self.connection.initialized())
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Create a cache client for `uri` (`redis://host:port/db`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URI cannot be parsed.
    pub fn new(uri: &str) -> Result<Self, SinkError> {
        let client = redis::Client::open(uri).map_err(|e| SinkError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            io_timeout: DEFAULT_SINK_WRITE_TIMEOUT,
            connection: OnceCell::new(),
        })
    }

    /// Bound connects and responses by `limit` instead of the default.
    #[must_use]
    pub fn with_io_timeout(mut self, limit: Duration) -> Self {
        self.io_timeout = limit;
        self
    }

    fn connection_config(&self) -> AsyncConnectionConfig {
        AsyncConnectionConfig::new()
            .set_connection_timeout(self.io_timeout)
            .set_response_timeout(self.io_timeout)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, SinkError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                tracing::info!(timeout = ?self.io_timeout, "Opening Redis connection");
                self.client
                    .get_multiplexed_async_connection_with_config(&self.connection_config())
                    .await
                    .map_err(|e| SinkError::Unavailable(e.to_string()))
            })
            .await?;
        Ok(connection.clone())
    }
}

/// Expiry in whole seconds; Redis rejects a zero `EX`.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn store(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), SinkError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, expiry_secs(ttl))
            .await
            .map_err(|e| SinkError::Cache(e.to_string()))
    }
}
