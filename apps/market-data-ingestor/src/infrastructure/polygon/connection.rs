//! Live Session
//!
//! One authenticated WebSocket connection to the venue. The session owns the
//! socket; the stream loop reads frames from it until it fails or the run is
//! cancelled.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::auth::ApiKey;
use super::codec::EnvelopeCodec;
use super::messages::SubscriptionRequest;
use super::stream::StreamError;

/// Upper bound on sending the close frame during shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// An open, authenticated venue connection.
pub struct LiveSession {
    id: Uuid,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession").field("id", &self.id).finish_non_exhaustive()
    }
}

impl LiveSession {
    /// Dial `url`, authenticating with `api_key` in the handshake.
    ///
    /// # Errors
    ///
    /// Returns `DialTimeout` if the handshake does not complete within
    /// `dial_timeout`, `InvalidCredential` if the key cannot be sent as a
    /// header, or `Dial` for any other handshake failure.
    pub async fn connect(
        url: &str,
        api_key: &ApiKey,
        dial_timeout: Duration,
    ) -> Result<Self, StreamError> {
        let mut request = url.into_client_request().map_err(StreamError::Dial)?;
        let header = api_key
            .bearer_header()
            .map_err(|e| StreamError::InvalidCredential(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, header);

        let (socket, response) =
            tokio::time::timeout(dial_timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| StreamError::DialTimeout(dial_timeout))?
                .map_err(StreamError::Dial)?;

        let id = Uuid::new_v4();
        tracing::debug!(session_id = %id, status = %response.status(), "Handshake complete");

        Ok(Self { id, socket })
    }

    /// Session identifier, used to correlate log lines.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Send the subscription request.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub async fn subscribe(
        &mut self,
        codec: &EnvelopeCodec,
        request: &SubscriptionRequest,
    ) -> Result<(), StreamError> {
        let json = codec.encode(request).map_err(StreamError::Encode)?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(StreamError::Subscribe)
    }

    /// Read the next data frame.
    ///
    /// Returns `Ok(None)` for control frames and non-UTF-8 binary frames,
    /// which carry no records. Pings are answered before returning.
    ///
    /// # Errors
    ///
    /// Returns `Closed` when the peer closes the connection and `Read` for
    /// transport errors.
    pub async fn read_frame(&mut self) -> Result<Option<String>, StreamError> {
        match self.socket.next().await {
            Some(Ok(Message::Text(text))) => Ok(Some(text.to_string())),
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => Ok(Some(text)),
                Err(_) => {
                    tracing::debug!(session_id = %self.id, len = bytes.len(), "Dropping non-UTF-8 binary frame");
                    Ok(None)
                }
            },
            Some(Ok(Message::Ping(data))) => {
                self.socket
                    .send(Message::Pong(data))
                    .await
                    .map_err(StreamError::Read)?;
                Ok(None)
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(session_id = %self.id, ?frame, "Server sent close frame");
                Err(StreamError::Closed)
            }
            Some(Ok(_)) => Ok(None),
            Some(Err(e)) => Err(StreamError::Read(e)),
            None => Err(StreamError::Closed),
        }
    }

    /// Close the connection, giving up after a short timeout.
    pub async fn close(mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.socket.close(None)).await {
            Ok(Ok(())) => tracing::debug!(session_id = %self.id, "Session closed"),
            Ok(Err(e)) => tracing::debug!(session_id = %self.id, error = %e, "Close handshake failed"),
            Err(_) => tracing::debug!(session_id = %self.id, "Close handshake timed out"),
        }
    }
}
