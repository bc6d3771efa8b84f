//! Feed Stream Integration Tests
//!
//! Drives `FeedStream` against a local WebSocket server to cover the live
//! session, its failure paths into synthetic mode, and cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use market_data_ingestor::{
    ApiKey, FeedConfig, FeedMode, FeedStream, RawEquityAggregate, RawOptionQuote, StreamError,
};
use rust_decimal::Decimal;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

// =============================================================================
// Helpers
// =============================================================================

struct Harness {
    stream: Arc<FeedStream>,
    aggregates: mpsc::UnboundedReceiver<RawEquityAggregate>,
    quotes: mpsc::UnboundedReceiver<RawOptionQuote>,
    cancel: CancellationToken,
    run: JoinHandle<StreamError>,
}

impl Harness {
    fn start(config: FeedConfig) -> Self {
        let stream = Arc::new(FeedStream::new(config));

        let (agg_tx, aggregates) = mpsc::unbounded_channel();
        stream.on_aggregate(Arc::new(move |aggregate: RawEquityAggregate| {
            let tx = agg_tx.clone();
            async move {
                let _ = tx.send(aggregate);
            }
        }));

        let (quote_tx, quotes) = mpsc::unbounded_channel();
        stream.on_quote(Arc::new(move |quote: RawOptionQuote| {
            let tx = quote_tx.clone();
            async move {
                let _ = tx.send(quote);
            }
        }));

        let cancel = CancellationToken::new();
        let run = tokio::spawn({
            let stream = Arc::clone(&stream);
            let cancel = cancel.clone();
            async move { stream.run(cancel).await }
        });

        Self {
            stream,
            aggregates,
            quotes,
            cancel,
            run,
        }
    }

    async fn next_aggregate(&mut self) -> RawEquityAggregate {
        tokio::time::timeout(WAIT, self.aggregates.recv())
            .await
            .expect("timed out waiting for aggregate")
            .expect("aggregate channel closed")
    }

    async fn next_quote(&mut self) -> RawOptionQuote {
        tokio::time::timeout(WAIT, self.quotes.recv())
            .await
            .expect("timed out waiting for quote")
            .expect("quote channel closed")
    }

    async fn stop(self) -> StreamError {
        self.cancel.cancel();
        tokio::time::timeout(WAIT, self.run)
            .await
            .expect("run did not return after cancellation")
            .unwrap()
    }
}

fn live_config(url: String, symbols: &[&str]) -> FeedConfig {
    let mut config = FeedConfig::new(
        ApiKey::new("test-key"),
        symbols.iter().map(ToString::to_string).collect(),
    );
    config.url = url;
    config.dial_timeout = Duration::from_millis(500);
    config.synthetic_interval = Duration::from_millis(200);
    config
}

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

/// Accept one WebSocket client, returning it with its `Authorization` header.
async fn accept(listener: &TcpListener) -> (WebSocketStream<TcpStream>, Option<String>) {
    let (tcp, _) = listener.accept().await.unwrap();
    let mut authorization = None;
    let ws = tokio_tungstenite::accept_hdr_async(tcp, |request: &Request, response: Response| {
        authorization = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok::<_, ErrorResponse>(response)
    })
    .await
    .unwrap();
    (ws, authorization)
}

async fn read_subscription(ws: &mut WebSocketStream<TcpStream>) -> serde_json::Value {
    let message = tokio::time::timeout(WAIT, ws.next())
        .await
        .expect("no subscription received")
        .unwrap()
        .unwrap();
    serde_json::from_str(message.to_text().unwrap()).unwrap()
}

/// Drain the connection, reporting whether the client sent a close frame.
async fn drain_until_close(mut ws: WebSocketStream<TcpStream>) -> bool {
    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Close(_)) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

const BATCH: &str = r#"[
    {"ev":"A","data":{"symbol":"AAPL","open":189.1,"high":190.2,"low":188.7,"close":189.9,"volume":120000,"vwap":189.5,"timestamp":"2025-01-02T15:00:00Z"}},
    {"ev":"A","data":{"symbol":"MSFT","open":"not a price"}},
    {"ev":"status","data":{"message":"authenticated"}},
    {"ev":"Q","data":{"symbol":"O:AAPL250117C00150000","bid":1.2,"ask":1.4,"bid_size":10,"ask_size":12,"timestamp":"2025-01-02T15:00:00Z"}}
]"#;

// =============================================================================
// Live Session
// =============================================================================

#[tokio::test]
async fn live_session_authenticates_subscribes_and_dispatches() {
    let (listener, url) = listen().await;
    let (closed_tx, closed_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let (mut ws, authorization) = accept(&listener).await;
        let subscription = read_subscription(&mut ws).await;
        ws.send(Message::Text(BATCH.into())).await.unwrap();
        let _ = closed_tx.send(drain_until_close(ws).await);
        (authorization, subscription)
    });

    let mut harness = Harness::start(live_config(url, &["AAPL", "MSFT"]));

    let aggregate = harness.next_aggregate().await;
    assert_eq!(aggregate.symbol, "AAPL");
    assert_eq!(aggregate.vwap, Decimal::new(1895, 1));

    let quote = harness.next_quote().await;
    assert_eq!(quote.symbol, "O:AAPL250117C00150000");
    assert_eq!(quote.bid, Decimal::new(12, 1));

    let status = harness.stream.status();
    assert_eq!(status.mode(), Some(FeedMode::Live));
    assert_eq!(status.envelopes_received(), 4);
    assert_eq!(status.decode_failures(), 1);

    let outcome = harness.stop().await;
    assert!(matches!(outcome, StreamError::Cancelled));

    let saw_close = tokio::time::timeout(WAIT, closed_rx).await.unwrap().unwrap();
    assert!(saw_close, "client should send a close frame on cancellation");

    let (authorization, subscription) = server.await.unwrap();
    assert_eq!(authorization.as_deref(), Some("Bearer test-key"));
    assert_eq!(
        subscription,
        serde_json::json!({
            "action": "subscribe",
            "params": ["A.AAPL", "Q.AAPL", "A.MSFT", "Q.MSFT"]
        })
    );
    assert_eq!(status.fallbacks(), 0);
}

#[tokio::test]
async fn empty_symbol_set_subscribes_to_wildcard() {
    let (listener, url) = listen().await;

    let server = tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        let subscription = read_subscription(&mut ws).await;
        drain_until_close(ws).await;
        subscription
    });

    let harness = Harness::start(live_config(url, &[]));
    let went_live = tokio::time::timeout(WAIT, async {
        while harness.stream.status().mode() != Some(FeedMode::Live) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(went_live.is_ok());

    harness.stop().await;
    let subscription = server.await.unwrap();
    assert_eq!(subscription["params"], serde_json::json!(["T.*"]));
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let (listener, url) = listen().await;

    let server = tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        read_subscription(&mut ws).await;
        ws.send(Message::Ping(b"hb".to_vec().into())).await.unwrap();
        let reply = tokio::time::timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        drain_until_close(ws).await;
        reply
    });

    let harness = Harness::start(live_config(url, &["SPY"]));
    while !server.is_finished() && harness.stream.status().mode() != Some(FeedMode::Live) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness.stop().await;

    match server.await.unwrap() {
        Message::Pong(payload) => assert_eq!(payload.as_ref(), b"hb"),
        other => panic!("expected pong, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_interrupts_stalled_live_handler() {
    let (listener, url) = listen().await;
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        read_subscription(&mut ws).await;
        ws.send(Message::Text(BATCH.into())).await.unwrap();
        let _ = closed_tx.send(drain_until_close(ws).await);
    });

    let stream = Arc::new(FeedStream::new(live_config(url, &["AAPL"])));
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    stream.on_aggregate(Arc::new(move |_: RawEquityAggregate| {
        let _ = entered_tx.send(());
        std::future::pending::<()>()
    }));

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let stream = Arc::clone(&stream);
        let cancel = cancel.clone();
        async move { stream.run(cancel).await }
    });

    tokio::time::timeout(WAIT, entered_rx.recv())
        .await
        .expect("handler never invoked")
        .unwrap();
    cancel.cancel();

    let outcome = tokio::time::timeout(WAIT, run)
        .await
        .expect("run did not return while the handler was stalled")
        .unwrap();
    assert!(matches!(outcome, StreamError::Cancelled));
    assert_eq!(stream.status().fallbacks(), 0);

    let saw_close = tokio::time::timeout(WAIT, closed_rx).await.unwrap().unwrap();
    assert!(saw_close, "client should still send a close frame");
}

#[tokio::test]
async fn cancellation_at_handshake_sends_no_subscription() {
    let (listener, url) = listen().await;
    let cancel = CancellationToken::new();

    // Cancel while the upgrade response is still being written.
    let server = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let accepted =
                tokio_tungstenite::accept_hdr_async(tcp, |_: &Request, response: Response| {
                    cancel.cancel();
                    Ok::<_, ErrorResponse>(response)
                })
                .await;
            let Ok(mut ws) = accepted else {
                return None;
            };
            match tokio::time::timeout(WAIT, ws.next()).await {
                Ok(Some(Ok(message))) => Some(message),
                _ => None,
            }
        }
    });

    let stream = FeedStream::new(live_config(url, &["AAPL"]));
    let outcome = tokio::time::timeout(WAIT, stream.run(cancel))
        .await
        .expect("run did not return after cancellation");
    assert!(matches!(outcome, StreamError::Cancelled));
    assert_eq!(stream.status().mode(), None);

    let first = server.await.unwrap();
    assert!(
        !matches!(first, Some(Message::Text(_))),
        "no subscription may follow cancellation, got {first:?}"
    );
}

// =============================================================================
// Fallback to Synthetic
// =============================================================================

#[tokio::test]
async fn server_close_falls_back_to_synthetic() {
    let (listener, url) = listen().await;

    tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        read_subscription(&mut ws).await;
        ws.close(None).await.unwrap();
    });

    let mut harness = Harness::start(live_config(url, &["AAPL"]));

    let aggregate = harness.next_aggregate().await;
    assert_eq!(aggregate.symbol, "AAPL");
    assert_eq!(aggregate.open, Decimal::new(100, 0));
    assert_eq!(harness.next_quote().await.symbol, "AAPL 2025-01-17 150C");

    let status = harness.stream.status();
    assert_eq!(status.mode(), Some(FeedMode::Synthetic));
    assert_eq!(status.fallbacks(), 1);
    assert!(status.last_fallback_reason().is_some());

    assert!(matches!(harness.stop().await, StreamError::Cancelled));
}

#[tokio::test]
async fn dial_failure_falls_back_to_synthetic() {
    let (listener, url) = listen().await;
    drop(listener);

    let mut harness = Harness::start(live_config(url, &["MSFT"]));

    assert_eq!(harness.next_aggregate().await.symbol, "MSFT");
    let status = harness.stream.status();
    assert_eq!(status.mode(), Some(FeedMode::Synthetic));
    assert!(status.last_fallback_reason().unwrap().contains("dial failed"));

    harness.stop().await;
}

#[tokio::test]
async fn stalled_handshake_times_out_into_synthetic() {
    let (listener, url) = listen().await;

    // Accept TCP but never answer the upgrade.
    let _server = tokio::spawn(async move {
        let (_tcp, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let mut harness = Harness::start(live_config(url, &["QQQ"]));

    assert_eq!(harness.next_aggregate().await.symbol, "QQQ");
    assert!(
        harness
            .stream
            .status()
            .last_fallback_reason()
            .unwrap()
            .contains("timed out")
    );

    harness.stop().await;
}

#[tokio::test]
async fn missing_key_goes_straight_to_synthetic() {
    let mut config = FeedConfig::new(None, vec!["AAPL".to_string(), "MSFT".to_string()]);
    config.url = "ws://127.0.0.1:9".to_string();
    config.synthetic_interval = Duration::from_millis(200);

    let mut harness = Harness::start(config);

    assert_eq!(harness.next_aggregate().await.symbol, "AAPL");
    assert_eq!(harness.next_aggregate().await.symbol, "MSFT");
    assert_eq!(harness.stream.status().fallbacks(), 0);
    assert_eq!(harness.stream.status().mode(), Some(FeedMode::Synthetic));

    harness.stop().await;
}

#[tokio::test]
async fn cancellation_during_dial_returns_promptly() {
    let (listener, url) = listen().await;
    let _server = tokio::spawn(async move {
        let (_tcp, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let mut config = live_config(url, &["AAPL"]);
    config.dial_timeout = Duration::from_secs(30);
    let harness = Harness::start(config);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let outcome = harness.stop().await;
    assert!(matches!(outcome, StreamError::Cancelled));
}
