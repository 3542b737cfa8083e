//! Configuration error taxonomy.

use thiserror::Error;

/// Errors raised while loading or validating configuration. All of these
/// are startup-time/fatal per the engine's error taxonomy -- a bad config
/// should never surface mid-request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A configured file contained invalid JSON.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration value was invalid (duplicate name, unknown
    /// reference, unsupported operator, etc).
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// A downstream construction (mapper, indexer, counter producer)
    /// rejected the loaded configuration.
    #[error("{0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
