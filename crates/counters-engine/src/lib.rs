//! Wires `FactMapper -> FactIndexer -> StorageLayer -> CounterProducer ->
//! DebugLogSampler` into one [`IngestionPipeline`], the engine's top-level
//! orchestration layer.

pub mod boundary;
pub mod error;
pub mod log_sampler;
pub mod pipeline;
pub mod processing_time;

#[cfg(test)]
mod test_support;

pub use boundary::{OutboundResponse, generate_example_message};
pub use error::IngestionError;
pub use log_sampler::DebugLogSampler;
pub use pipeline::{DispatchTimeouts, IngestionPipeline, IngestionResult};
pub use processing_time::{Metrics, ProcessingTime};
