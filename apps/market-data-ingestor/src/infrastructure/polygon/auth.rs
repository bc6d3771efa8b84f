//! Polygon Credentials
//!
//! The venue authenticates during the WebSocket handshake with an
//! `Authorization: Bearer <key>` header; there is no in-band auth message.

use tokio_tungstenite::tungstenite::http::HeaderValue;

/// Polygon API key.
///
/// `Debug` and `Display` redact the key for safe logging.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key. Returns `None` for a blank key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Get the raw key.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Build the handshake `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key contains bytes not allowed in a header.
    pub fn bearer_header(
        &self,
    ) -> Result<HeaderValue, tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue>
    {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "{visible}****")
    }
}
