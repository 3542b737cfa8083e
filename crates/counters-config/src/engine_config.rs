//! `EngineConfig` -- the handful of environment-derived scalars the engine
//! and its (out-of-scope) transport boundary both read.
//!
//! Everything here is a plain `std::env::var` read with a default, the way
//! the rest of this corpus favors explicit code over a config-framework
//! dependency for a handful of scalars. `MONGODB_*`/`WEB_PORT`/
//! `CLUSTER_WORKERS` are carried only so a future HTTP boundary can read
//! them from the same struct; the engine itself never inspects them.

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub message_config_path: String,
    pub index_config_path: String,
    pub counter_config_path: String,
    /// `INCLUDE_FACT_DATA_TO_INDEX` -- embeds the fact payload into each
    /// index entry, avoiding a join back to `facts` at counter-eval time.
    pub include_fact_data_to_index: bool,
    /// `LOG_SAVE_FREQUENCY` -- requests per debug-log sample window.
    pub log_save_frequency: u64,
    /// `FACT_TARGET_SIZE` -- target byte size for generated example messages.
    pub fact_target_size: usize,
    /// `ALLOWED_MESSAGE_TYPES` -- optional whitelist; `None` accepts all.
    pub allowed_message_types: Option<Vec<i32>>,
    pub log_level: String,
    /// Inert: consumed only by the out-of-scope HTTP/Mongo transport layer.
    pub mongodb_uri: Option<String>,
    /// Inert: consumed only by the out-of-scope HTTP transport layer.
    pub web_port: Option<u16>,
    /// Inert: consumed only by the out-of-scope HTTP transport layer's
    /// own process-cluster, unrelated to the QueryDispatcher worker pool.
    pub cluster_workers: Option<usize>,
}

impl EngineConfig {
    /// Reads every setting from its named environment variable.
    /// `MESSAGE_CONFIG_PATH`/`INDEX_CONFIG_PATH`/`COUNTER_CONFIG_PATH`
    /// are required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            message_config_path: require_env("MESSAGE_CONFIG_PATH")?,
            index_config_path: require_env("INDEX_CONFIG_PATH")?,
            counter_config_path: require_env("COUNTER_CONFIG_PATH")?,
            include_fact_data_to_index: env_bool("INCLUDE_FACT_DATA_TO_INDEX", false),
            log_save_frequency: env_parse("LOG_SAVE_FREQUENCY", 100)?,
            fact_target_size: env_parse("FACT_TARGET_SIZE", 512)?,
            allowed_message_types: env_csv_i32("ALLOWED_MESSAGE_TYPES"),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            mongodb_uri: std::env::var("MONGODB_URI").ok(),
            web_port: std::env::var("WEB_PORT").ok().and_then(|v| v.parse().ok()),
            cluster_workers: std::env::var("CLUSTER_WORKERS").ok().and_then(|v| v.parse().ok()),
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::InvalidValue {
        key: name.to_string(),
        reason: "environment variable is required but unset".to_string(),
    })
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
            key: name.to_string(),
            reason: format!("'{v}' is not a valid value"),
        }),
    }
}

fn env_csv_i32(name: &str) -> Option<Vec<i32>> {
    let raw = std::env::var(name).ok()?;
    Some(
        raw.split(',')
            .filter_map(|s| s.trim().parse::<i32>().ok())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize access so tests
    // in this module never race each other's `std::env::set_var` calls.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn required_paths_must_be_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::remove_var("MESSAGE_CONFIG_PATH");
        }
        let err = EngineConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn defaults_and_parsing_round_trip() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MESSAGE_CONFIG_PATH", "/tmp/message.json");
            std::env::set_var("INDEX_CONFIG_PATH", "/tmp/index.json");
            std::env::set_var("COUNTER_CONFIG_PATH", "/tmp/counter.json");
            std::env::set_var("ALLOWED_MESSAGE_TYPES", "1, 2,3");
            std::env::remove_var("LOG_SAVE_FREQUENCY");
        }
        let cfg = EngineConfig::from_env().unwrap();
        assert_eq!(cfg.log_save_frequency, 100);
        assert_eq!(cfg.allowed_message_types, Some(vec![1, 2, 3]));
        assert_eq!(cfg.log_level, "INFO");
        unsafe {
            std::env::remove_var("MESSAGE_CONFIG_PATH");
            std::env::remove_var("INDEX_CONFIG_PATH");
            std::env::remove_var("COUNTER_CONFIG_PATH");
            std::env::remove_var("ALLOWED_MESSAGE_TYPES");
        }
    }
}
