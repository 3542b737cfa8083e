//! Typed configuration loading for the fact/index counter engine.
//!
//! Every module above this crate is parameterized by configuration --
//! which fields map to which fact properties, which fields are indexed,
//! which counters to compute -- that has to be constructed from three
//! JSON documents (`MESSAGE_CONFIG_PATH`, `INDEX_CONFIG_PATH`,
//! `COUNTER_CONFIG_PATH`) plus a handful of scalar environment variables.
//! This crate owns that loading and the config-time validation (duplicate
//! names, unknown references, unsupported operators) that must fail fast
//! rather than surface mid-request.

pub mod counter_config;
pub mod engine_config;
pub mod error;
pub mod index_config;
pub mod message_config;

pub use counter_config::CounterConfig;
pub use engine_config::EngineConfig;
pub use error::ConfigError;
pub use index_config::{IndexConfig, IndexEntryDefinition};
pub use message_config::MessageConfig;

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::Result;

/// Reads and parses a JSON config file, attaching the path to any error
/// so a startup failure names the file that's wrong.
pub(crate) fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.display().to_string(),
        source,
    })
}
