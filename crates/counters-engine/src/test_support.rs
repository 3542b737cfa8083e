//! An in-memory [`StorageLayer`] used only by this crate's own tests --
//! real persistence is `counters-storage`'s concern.

use std::collections::BTreeMap;
use std::sync::Mutex;

use counters_core::fact::Fact;
use counters_core::index_entry::IndexEntry;
use counters_storage::{LogEntry, SaveOutcome, StorageError, StorageLayer, TimeWindow};

#[derive(Default)]
pub struct RecordingStorage {
    facts: Mutex<Vec<Fact>>,
    entries: Mutex<Vec<IndexEntry>>,
    logs: Mutex<Vec<LogEntry>>,
}

impl RecordingStorage {
    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().unwrap().clone()
    }

    pub fn facts(&self) -> Vec<Fact> {
        self.facts.lock().unwrap().clone()
    }
}

impl StorageLayer for RecordingStorage {
    fn save_fact(&self, fact: &Fact) -> counters_storage::error::Result<SaveOutcome> {
        let mut facts = self.facts.lock().unwrap();
        let existing = facts.iter().find(|f| f.id == fact.id).cloned();
        let outcome = match existing {
            None => SaveOutcome::Inserted,
            Some(prev) if prev.t == fact.t && prev.d == fact.d => SaveOutcome::Ignored,
            Some(_) => SaveOutcome::Updated,
        };
        facts.retain(|f| f.id != fact.id);
        facts.push(fact.clone());
        Ok(outcome)
    }

    fn get_fact(&self, id: &str) -> counters_storage::error::Result<Fact> {
        self.facts
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("fact", id))
    }

    fn save_fact_index_list(&self, new_entries: &[IndexEntry]) -> counters_storage::error::Result<()> {
        self.entries.lock().unwrap().extend(new_entries.iter().cloned());
        Ok(())
    }

    fn get_relevant_facts(
        &self,
        hash_values: &BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: &str,
        row_cap: usize,
    ) -> counters_storage::error::Result<Vec<Fact>> {
        let entries = self.entries.lock().unwrap();
        let facts = self.facts.lock().unwrap();
        let mut matching_ids: Vec<&str> = entries
            .iter()
            .filter(|e| {
                hash_values
                    .get(&e.it)
                    .is_some_and(|hashes| hashes.contains(&e.id.h))
                    && e.dt.timestamp_millis() >= window.from_ms
                    && e.dt.timestamp_millis() < window.to_ms
                    && e.id.f != exclude_fact_id
            })
            .map(|e| e.id.f.as_str())
            .collect();
        matching_ids.sort();
        matching_ids.dedup();
        Ok(facts
            .iter()
            .filter(|f| matching_ids.contains(&f.id.as_str()))
            .take(row_cap)
            .cloned()
            .collect())
    }

    fn get_relevant_fact_count(
        &self,
        hash_values: &BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: &str,
    ) -> counters_storage::error::Result<i64> {
        Ok(self.get_relevant_facts(hash_values, window, exclude_fact_id, usize::MAX)?.len() as i64)
    }

    fn save_log(&self, entry: &LogEntry) -> counters_storage::error::Result<()> {
        self.logs.lock().unwrap().push(entry.clone());
        Ok(())
    }

    fn set_config(&self, _key: &str, _value: &str) -> counters_storage::error::Result<()> {
        Ok(())
    }

    fn get_config(&self, _key: &str) -> counters_storage::error::Result<String> {
        Ok(String::new())
    }
}
