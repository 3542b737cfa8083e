//! Runtime context resolved from global flags once per invocation.
//!
//! Mirrors the shape of the configuration every command needs without
//! forcing every command to build the full engine -- `init` only touches
//! `db`, `example-message` only touches `message_config`, and so on.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use counters_storage::SqliteStore;

use crate::cli::GlobalArgs;

pub struct RuntimeContext {
    pub db: PathBuf,
    pub message_config: Option<PathBuf>,
    pub index_config: Option<PathBuf>,
    pub counter_config: Option<PathBuf>,
    pub json: bool,
    pub verbose: bool,
}

impl RuntimeContext {
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            db: global.db.clone(),
            message_config: global.message_config.clone(),
            index_config: global.index_config.clone(),
            counter_config: global.counter_config.clone(),
            json: global.json,
            verbose: global.verbose,
        }
    }

    pub fn open_store(&self) -> Result<Arc<SqliteStore>> {
        Ok(Arc::new(
            SqliteStore::open(&self.db).with_context(|| format!("opening store at {}", self.db.display()))?,
        ))
    }

    pub fn message_config_path(&self) -> Result<&PathBuf> {
        self.message_config
            .as_ref()
            .context("--message-config (or $MESSAGE_CONFIG_PATH) is required")
    }

    pub fn index_config_path(&self) -> Result<&PathBuf> {
        self.index_config
            .as_ref()
            .context("--index-config (or $INDEX_CONFIG_PATH) is required")
    }

    pub fn counter_config_path(&self) -> Result<&PathBuf> {
        self.counter_config
            .as_ref()
            .context("--counter-config (or $COUNTER_CONFIG_PATH) is required")
    }
}
