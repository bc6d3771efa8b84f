//! Ingestor Configuration Settings
//!
//! Configuration types for the ingestor, loaded from environment variables.
//! Parsing goes through a lookup function so it can be exercised without
//! touching the process environment.

use std::time::Duration;

use crate::application::services::DEFAULT_SINK_WRITE_TIMEOUT;
use crate::infrastructure::polygon::{
    ApiKey, DEFAULT_DIAL_TIMEOUT, DEFAULT_SYNTHETIC_INTERVAL, DEFAULT_WS_URL, FeedConfig,
};

/// Symbols used when `POLYGON_SYMBOLS` is unset or names no symbol.
pub const DEFAULT_SYMBOLS: &str = "AAPL,MSFT";

/// Durable log topic used when `EVENT_LOG_TOPIC` is unset.
pub const DEFAULT_LOG_TOPIC: &str = "market-data";

/// Sink connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSettings {
    /// Redis connection string.
    pub redis_uri: String,
    /// NATS server URL.
    pub nats_url: String,
    /// Durable log topic.
    pub log_topic: String,
    /// Archive bucket.
    pub archive_bucket: String,
    /// Bound on each sink write.
    pub write_timeout: Duration,
}

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Health check and metrics HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete ingestor configuration.
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Venue feed settings.
    pub feed: FeedConfig,
    /// Sink connection settings.
    pub sinks: SinkSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl IngestorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty, or if a
    /// numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`IngestorConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sinks = SinkSettings {
            redis_uri: required(&lookup, "REDIS_URI")?,
            nats_url: required(&lookup, "NATS_URL")?,
            log_topic: optional(&lookup, "EVENT_LOG_TOPIC")
                .unwrap_or_else(|| DEFAULT_LOG_TOPIC.to_string()),
            archive_bucket: required(&lookup, "S3_BUCKET")?,
            write_timeout: parse_secs(
                &lookup,
                "SINK_WRITE_TIMEOUT_SECS",
                DEFAULT_SINK_WRITE_TIMEOUT,
            )?,
        };

        let symbols = parse_symbols(&optional(&lookup, "POLYGON_SYMBOLS").unwrap_or_default());

        let feed = FeedConfig {
            url: optional(&lookup, "POLYGON_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            api_key: lookup("POLYGON_API_KEY").and_then(ApiKey::new),
            symbols,
            synthetic_only: lookup("POLYGON_SYNTHETIC_ONLY").is_some_and(|v| parse_flag(&v)),
            dial_timeout: parse_secs(&lookup, "POLYGON_DIAL_TIMEOUT_SECS", DEFAULT_DIAL_TIMEOUT)?,
            synthetic_interval: parse_secs(
                &lookup,
                "POLYGON_SYNTHETIC_INTERVAL_SECS",
                DEFAULT_SYNTHETIC_INTERVAL,
            )?,
        };

        let server = ServerSettings {
            health_port: match optional(&lookup, "INGESTOR_HEALTH_PORT") {
                Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "INGESTOR_HEALTH_PORT".to_string(),
                    value,
                })?,
                None => ServerSettings::default().health_port,
            },
        };

        Ok(Self {
            feed,
            sinks,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
}

/// Split a comma list into trimmed, upper-cased symbols, dropping blanks.
///
/// A list that names no symbol yields [`DEFAULT_SYMBOLS`].
#[must_use]
pub fn parse_symbols(raw: &str) -> Vec<String> {
    let symbols = split_symbols(raw);
    if symbols.is_empty() {
        split_symbols(DEFAULT_SYMBOLS)
    } else {
        symbols
    }
}

fn split_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Interpret a boolean flag: `1` or `true` (any case) is set.
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
    let raw = raw.trim();
    raw == "1" || raw.eq_ignore_ascii_case("true")
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = optional(lookup, key) else {
        return Ok(default);
    };

    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("REDIS_URI", "redis://localhost:6379/0"),
        ("NATS_URL", "nats://localhost:4222"),
        ("S3_BUCKET", "market-archive"),
    ];

    #[test]
    fn defaults_with_required_only() {
        let config = IngestorConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.feed.symbols, vec!["AAPL", "MSFT"]);
        assert!(config.feed.api_key.is_none());
        assert!(!config.feed.synthetic_only);
        assert_eq!(config.feed.url, DEFAULT_WS_URL);
        assert_eq!(config.feed.dial_timeout, Duration::from_secs(10));
        assert_eq!(config.feed.synthetic_interval, Duration::from_secs(5));
        assert_eq!(config.sinks.log_topic, "market-data");
        assert_eq!(config.sinks.archive_bucket, "market-archive");
        assert_eq!(config.sinks.write_timeout, Duration::from_secs(5));
        assert_eq!(config.server.health_port, 8083);
    }

    #[test_case("REDIS_URI" ; "redis")]
    #[test_case("NATS_URL" ; "nats")]
    #[test_case("S3_BUCKET" ; "bucket")]
    fn missing_required_variable(key: &str) {
        let pairs: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != key).collect();
        assert_eq!(
            IngestorConfig::from_lookup(lookup_from(&pairs)).unwrap_err(),
            ConfigError::MissingEnvVar(key.to_string())
        );
    }

    #[test]
    fn empty_required_variable() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("NATS_URL", "  ");
        assert_eq!(
            IngestorConfig::from_lookup(lookup_from(&pairs)).unwrap_err(),
            ConfigError::EmptyValue("NATS_URL".to_string())
        );
    }

    #[test]
    fn feed_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("POLYGON_API_KEY", "pk_test"),
            ("POLYGON_SYMBOLS", " spy, ,qqq "),
            ("POLYGON_SYNTHETIC_ONLY", "TRUE"),
            ("POLYGON_WS_URL", "ws://127.0.0.1:9000"),
            ("POLYGON_DIAL_TIMEOUT_SECS", "2"),
            ("POLYGON_SYNTHETIC_INTERVAL_SECS", "1"),
            ("EVENT_LOG_TOPIC", "ticks"),
            ("SINK_WRITE_TIMEOUT_SECS", "3"),
            ("INGESTOR_HEALTH_PORT", "9100"),
        ]);

        let config = IngestorConfig::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.feed.api_key.as_ref().map(ApiKey::expose), Some("pk_test"));
        assert_eq!(config.feed.symbols, vec!["SPY", "QQQ"]);
        assert!(config.feed.synthetic_only);
        assert_eq!(config.feed.url, "ws://127.0.0.1:9000");
        assert_eq!(config.feed.dial_timeout, Duration::from_secs(2));
        assert_eq!(config.feed.synthetic_interval, Duration::from_secs(1));
        assert_eq!(config.sinks.log_topic, "ticks");
        assert_eq!(config.sinks.write_timeout, Duration::from_secs(3));
        assert_eq!(config.server.health_port, 9100);
    }

    #[test]
    fn empty_api_key_means_no_key() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLYGON_API_KEY", ""));
        let config = IngestorConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.feed.api_key.is_none());
    }

    #[test_case("POLYGON_SYNTHETIC_INTERVAL_SECS", "0" ; "zero interval")]
    #[test_case("POLYGON_DIAL_TIMEOUT_SECS", "soon" ; "non numeric timeout")]
    #[test_case("SINK_WRITE_TIMEOUT_SECS", "0" ; "zero write timeout")]
    #[test_case("INGESTOR_HEALTH_PORT", "70000" ; "port out of range")]
    fn invalid_numeric_values(key: &str, value: &str) {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((key, value));
        assert!(matches!(
            IngestorConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test_case("AAPL,MSFT", &["AAPL", "MSFT"] ; "plain list")]
    #[test_case(" aapl , msft ", &["AAPL", "MSFT"] ; "trimmed and uppercased")]
    #[test_case("spy,,", &["SPY"] ; "blanks dropped")]
    #[test_case(",", &["AAPL", "MSFT"] ; "only separators")]
    #[test_case("", &["AAPL", "MSFT"] ; "empty")]
    fn symbol_parsing(raw: &str, expected: &[&str]) {
        assert_eq!(parse_symbols(raw), expected);
    }

    #[test_case(" , " ; "separators and spaces")]
    #[test_case(",,," ; "separators only")]
    fn symbol_list_naming_nothing_uses_defaults(raw: &str) {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLYGON_SYMBOLS", raw));
        let config = IngestorConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.feed.symbols, vec!["AAPL", "MSFT"]);
    }

    #[test_case("1", true ; "one")]
    #[test_case("true", true ; "lowercase true")]
    #[test_case("True", true ; "mixed case true")]
    #[test_case("0", false ; "zero")]
    #[test_case("yes", false ; "yes is not accepted")]
    #[test_case("", false ; "empty")]
    fn flag_parsing(raw: &str, expected: bool) {
        assert_eq!(parse_flag(raw), expected);
    }

    #[test]
    fn api_key_redacted_in_debug() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLYGON_API_KEY", "pk_very_secret"));
        let config = IngestorConfig::from_lookup(lookup_from(&pairs)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("pk_very_secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
