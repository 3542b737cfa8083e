//! CounterProducer: groups counter definitions that share an index type,
//! window, and row cap into one storage fetch, and evaluates each
//! against freshly-ingested facts.

pub mod pipeline;
pub mod producer;
pub mod types;

pub use pipeline::{MatchStage, Pipeline};
pub use producer::{CounterProducer, PlannedCounter, PlannedJob, execute_job};
pub use types::{AggregateError, AggregationExpr, CounterDefinition, CounterResult};
