//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `IngestionPipeline`: normalizes feed records and fans them out to sinks

mod pipeline;

pub use pipeline::{DEFAULT_SINK_WRITE_TIMEOUT, IngestionPipeline};
