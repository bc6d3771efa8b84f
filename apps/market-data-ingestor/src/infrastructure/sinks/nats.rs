//! NATS JetStream event log adapter.
//!
//! The log topic is a JetStream stream of the same name. Each record is
//! published on `<topic>.<key>`, so records sharing a key land on the same
//! subject and keep their relative order. Characters that are not legal in a
//! subject token are replaced with `_`; the exact key travels in the
//! `Ingestor-Key` header.

use async_nats::jetstream::{self, stream::Stream};
use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::application::ports::{EventLog, SinkError};

/// Durable log publishing to a JetStream stream.
pub struct JetStreamLog {
    jetstream: jetstream::Context,
    topic: String,
    stream: OnceCell<Stream>,
}

impl std::fmt::Debug for JetStreamLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JetStreamLog")
            .field("topic", &self.topic)
            .field("stream_ready", &self.stream.initialized())
            .finish_non_exhaustive()
    }
}

impl JetStreamLog {
    /// Connect to NATS at `url` and publish to `topic`.
    ///
    /// The connection is established in the background, so an unreachable
    /// server surfaces as append failures rather than a startup error.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub async fn connect(url: &str, topic: impl Into<String>) -> Result<Self, SinkError> {
        tracing::info!(url, "Connecting to NATS");
        let client = async_nats::ConnectOptions::new()
            .retry_on_initial_connect()
            .connect(url)
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        Ok(Self {
            jetstream: jetstream::new(client),
            topic: topic.into(),
            stream: OnceCell::new(),
        })
    }

    /// Stream name and subject filter.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn ensure_stream(&self) -> Result<(), SinkError> {
        self.stream
            .get_or_try_init(|| async {
                tracing::info!(stream = %self.topic, "Ensuring JetStream stream exists");
                self.jetstream
                    .get_or_create_stream(jetstream::stream::Config {
                        name: self.topic.clone(),
                        subjects: vec![format!("{}.>", self.topic)],
                        storage: jetstream::stream::StorageType::File,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| SinkError::Unavailable(e.to_string()))
            })
            .await?;
        Ok(())
    }
}

/// Header carrying the unmodified record key.
pub const KEY_HEADER: &str = "Ingestor-Key";

/// Subject a record with `key` is published on.
#[must_use]
pub fn subject_for(topic: &str, key: &str) -> String {
    if key.is_empty() {
        return format!("{topic}._");
    }
    let token: String = key
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    format!("{topic}.{token}")
}

#[async_trait]
impl EventLog for JetStreamLog {
    async fn append(&self, key: &str, value: &[u8]) -> Result<(), SinkError> {
        self.ensure_stream().await?;

        let mut headers = async_nats::HeaderMap::new();
        headers.insert(KEY_HEADER, key);

        self.jetstream
            .publish_with_headers(subject_for(&self.topic, key), headers, value.to_vec().into())
            .await
            .map_err(|e| SinkError::Log(e.to_string()))?
            .await
            .map_err(|e| SinkError::Log(e.to_string()))?;
        Ok(())
    }
}
