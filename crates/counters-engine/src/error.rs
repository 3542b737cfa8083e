//! Errors an ingestion request can fail with: mapping/validation failures
//! carry no persistence and are a caller-class error; persistence
//! failures, after the one built-in retry, are an internal-class error.
//! Counter failures never reach here -- they degrade to an empty result
//! set inside [`crate::pipeline`].

/// The two failure classes an ingestion request can terminate in.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    /// The message failed to map to a fact: unknown message type, missing
    /// key field, or a field that couldn't be coerced. No persistence
    /// happened. A caller-class (4xx-equivalent) failure.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Persisting the fact or its index entries failed even after one
    /// retry. An internal-class (5xx-equivalent) failure.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl From<counters_core::mapper::MapperError> for IngestionError {
    fn from(e: counters_core::mapper::MapperError) -> Self {
        Self::Validation(e.to_string())
    }
}
