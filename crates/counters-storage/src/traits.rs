//! [`StorageLayer`] -- the public API the rest of the engine depends on.
//!
//! Consumers depend on this trait rather than on [`crate::sqlite::SqliteStore`]
//! directly so a mock can stand in during tests of the layers above.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use counters_core::fact::Fact;
use counters_core::index_entry::IndexEntry;

use crate::error::Result;

/// The outcome of one [`StorageLayer::save_fact`] call: whether the fact
/// was new, whether an existing row's `d`/`t` changed, or whether the
/// incoming fact was byte-identical to what was already stored (no write
/// issued). Surfaced end to end so a caller re-submitting the same
/// message can tell the difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    Inserted,
    Updated,
    Ignored,
}

/// A millisecond-epoch time window matched against an index entry's
/// domain date (`dt`): inclusive on `from_ms`, exclusive on `to_ms`
/// (`from_ms <= dt < to_ms`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from_ms: i64,
    pub to_ms: i64,
}

/// One row written by the debug log sampler: the worst (slowest) request
/// observed in a fixed-size window of recent requests.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub window_start: u64,
    pub window_end: u64,
    pub worst_millis: i64,
    pub detail: serde_json::Value,
}

/// Storage interface for facts, their index entries, and the debug log.
///
/// Mirrors the "document database cluster" described for the system: a
/// SQLite file stands in for the cluster, JSON TEXT columns stand in for
/// embedded documents, and [`crate::sharding::ShardingStrategy`] stands in
/// for multi-node routing.
pub trait StorageLayer: Send + Sync {
    /// Idempotently persists a fact. On conflict, updates `d` (and `t`)
    /// but leaves the original `c` (creation timestamp) untouched --
    /// re-ingesting the same fact never resets its age. Returns whether
    /// the row was inserted, updated, or left untouched because the
    /// incoming fact was already identical to what was stored.
    fn save_fact(&self, fact: &Fact) -> Result<SaveOutcome>;

    /// Retrieves a single fact by id.
    fn get_fact(&self, id: &str) -> Result<Fact>;

    /// Idempotently persists a batch of index entries. Re-saving an
    /// entry with the same `(h, f)` pair is a no-op on all columns except
    /// the ones that legitimately change (`v`, `dt`, `d`) if the
    /// underlying fact was re-mapped.
    fn save_fact_index_list(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Fetches up to `row_cap` facts matching any hash in `hash_values`
    /// (keyed by index type) whose entry date falls in `window`, newest
    /// first, strictly excluding `exclude_fact_id` (a fact is never
    /// counted among its own counters). The caller is expected to
    /// re-evaluate any condition that isn't expressible as a hash/window
    /// match against the returned facts -- this call narrows, it does
    /// not fully filter.
    fn get_relevant_facts(
        &self,
        hash_values: &BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: &str,
        row_cap: usize,
    ) -> Result<Vec<Fact>>;

    /// Like [`get_relevant_facts`](Self::get_relevant_facts) but returns
    /// only a count of distinct matching facts, uncapped. Counter
    /// definitions that only need a number skip materializing rows.
    fn get_relevant_fact_count(
        &self,
        hash_values: &BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: &str,
    ) -> Result<i64>;

    /// Records one debug-log sample (the worst request in a window).
    fn save_log(&self, entry: &LogEntry) -> Result<()>;

    /// Sets a configuration key-value pair (used for small persisted
    /// knobs, not for the JSON config files loaded at startup).
    fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Gets a configuration value by key.
    fn get_config(&self, key: &str) -> Result<String>;
}
