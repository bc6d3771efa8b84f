//! Domain Layer - Market data records and normalization.
//!
//! This layer contains the raw and canonical record types and the pure
//! normalizer. Nothing here performs I/O.

/// Raw venue records and canonical sink-ready records.
pub mod market_data;

/// Raw-to-canonical conversion.
pub mod normalizer;
