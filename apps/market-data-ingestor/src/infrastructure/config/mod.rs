//! Configuration Module
//!
//! Configuration loading for the ingestor service.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_LOG_TOPIC, DEFAULT_SYMBOLS, IngestorConfig, ServerSettings, SinkSettings,
    parse_flag, parse_symbols,
};
