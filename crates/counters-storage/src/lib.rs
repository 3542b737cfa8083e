//! Document-store facade: facts, fact index entries, and the debug log.
//!
//! Provides the [`StorageLayer`] trait and a SQLite-backed implementation
//! ([`SqliteStore`]).

pub mod error;
pub mod sharding;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use sharding::ShardingStrategy;
pub use sqlite::SqliteStore;
pub use traits::{LogEntry, SaveOutcome, StorageLayer, TimeWindow};

use std::collections::BTreeMap;

use counters_core::fact::Fact;
use counters_core::index_entry::IndexEntry;

use crate::error::Result;

impl StorageLayer for SqliteStore {
    fn save_fact(&self, fact: &Fact) -> Result<SaveOutcome> {
        self.save_fact_impl(fact)
    }

    fn get_fact(&self, id: &str) -> Result<Fact> {
        self.get_fact_impl(id)
    }

    fn save_fact_index_list(&self, entries: &[IndexEntry]) -> Result<()> {
        self.save_fact_index_list_impl(entries)
    }

    fn get_relevant_facts(
        &self,
        hash_values: &BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: &str,
        row_cap: usize,
    ) -> Result<Vec<Fact>> {
        self.get_relevant_facts_impl(hash_values, window, exclude_fact_id, row_cap)
    }

    fn get_relevant_fact_count(
        &self,
        hash_values: &BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: &str,
    ) -> Result<i64> {
        self.get_relevant_fact_count_impl(hash_values, window, exclude_fact_id)
    }

    fn save_log(&self, entry: &LogEntry) -> Result<()> {
        self.save_log_impl(entry)
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.set_config_impl(key, value)
    }

    fn get_config(&self, key: &str) -> Result<String> {
        self.get_config_impl(key)
    }
}
