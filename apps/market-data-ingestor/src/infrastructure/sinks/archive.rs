//! Bucket archive adapter.
//!
//! Object upload is not wired up yet; records are accepted and the would-be
//! upload is logged.

use async_trait::async_trait;

use crate::application::ports::{ArchiveSink, SinkError};

/// Cold-storage archive targeting an object-store bucket.
#[derive(Debug, Clone)]
pub struct BucketArchive {
    bucket: String,
}

impl BucketArchive {
    /// Create an archive for `bucket`.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    /// Target bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ArchiveSink for BucketArchive {
    async fn store(&self, key: &str, value: &[u8]) -> Result<(), SinkError> {
        tracing::debug!(bucket = %self.bucket, key, bytes = value.len(), "Archiving record");
        Ok(())
    }
}
