//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the feed and the sinks meet the domain.

/// Port interfaces for sinks and feed handlers.
pub mod ports;

/// Application services for record fan-out.
pub mod services;
