//! Market Data Ingestor Binary
//!
//! Streams market data from the venue feed into the cache, event log, and
//! archive.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-data-ingestor
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `REDIS_URI`: Cache connection string
//! - `NATS_URL`: Event log server URL
//! - `S3_BUCKET`: Archive bucket
//!
//! ## Optional
//! - `POLYGON_API_KEY`: Venue API key (unset: synthetic data only)
//! - `POLYGON_SYMBOLS`: Comma-separated symbols (default: AAPL,MSFT)
//! - `POLYGON_SYNTHETIC_ONLY`: "1" or "true" to skip the live feed
//! - `POLYGON_WS_URL`: Venue endpoint (default: <wss://socket.polygon.io/stocks>)
//! - `POLYGON_DIAL_TIMEOUT_SECS`: Handshake timeout (default: 10)
//! - `POLYGON_SYNTHETIC_INTERVAL_SECS`: Synthetic cadence (default: 5)
//! - `EVENT_LOG_TOPIC`: Event log topic (default: market-data)
//! - `SINK_WRITE_TIMEOUT_SECS`: Bound on each sink write (default: 5)
//! - `INGESTOR_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: market-data-ingestor)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::{Context, anyhow};
use market_data_ingestor::infrastructure::health::{HealthServer, HealthServerState};
use market_data_ingestor::infrastructure::sinks::{BucketArchive, JetStreamLog, RedisCache};
use market_data_ingestor::infrastructure::telemetry;
use market_data_ingestor::{FeedStream, IngestionPipeline, IngestorConfig, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Market Data Ingestor");

    init_metrics().context("failed to install Prometheus recorder")?;

    let config = IngestorConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Sinks
    let write_timeout = config.sinks.write_timeout;
    let cache = Arc::new(
        RedisCache::new(&config.sinks.redis_uri)
            .context("invalid REDIS_URI")?
            .with_io_timeout(write_timeout),
    );
    let log = Arc::new(
        JetStreamLog::connect(&config.sinks.nats_url, config.sinks.log_topic.clone())
            .await
            .context("invalid NATS_URL")?,
    );
    let archive = Arc::new(BucketArchive::new(config.sinks.archive_bucket.clone()));
    let pipeline =
        Arc::new(IngestionPipeline::new(cache, log, archive).with_write_timeout(write_timeout));

    // Feed
    let stream = FeedStream::new(config.feed.clone());
    stream.on_aggregate(pipeline.clone());
    stream.on_quote(pipeline);

    // Spawn health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        stream.status(),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tokio::spawn(await_shutdown(shutdown_token.clone()));

    tracing::info!("Ingestor ready");

    let outcome = stream.run(shutdown_token.clone()).await;
    shutdown_token.cancel();

    if outcome.is_cancelled() {
        tracing::info!("Ingestor stopped");
        Ok(())
    } else {
        tracing::error!(error = %outcome, "Feed stream terminated");
        Err(anyhow::Error::new(outcome).context("feed stream terminated"))
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &IngestorConfig) {
    tracing::info!(
        mode = config.feed.initial_mode().as_str(),
        symbols = ?config.feed.symbols,
        log_topic = %config.sinks.log_topic,
        archive_bucket = %config.sinks.archive_bucket,
        write_timeout_secs = config.sinks.write_timeout.as_secs(),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        url = %config.feed.url,
        dial_timeout_secs = config.feed.dial_timeout.as_secs(),
        synthetic_interval_secs = config.feed.synthetic_interval.as_secs(),
        "Feed settings"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel the token.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
