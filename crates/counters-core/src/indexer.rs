//! `FactIndexer` -- turns a [`Fact`] into a deterministic set of [`IndexEntry`]s.

use std::collections::{BTreeMap, HashSet};

use crate::fact::Fact;
use crate::hashing::index_key;
use crate::index_entry::{IndexEntry, IndexEntryId, IndexValueMode};

/// One index-field definition.
#[derive(Debug, Clone)]
pub struct IndexFieldConfig {
    /// Field in `fact.d` whose value is indexed.
    pub field_name: String,
    /// Field in `fact.d` that supplies the domain date (`dt`).
    pub date_name: String,
    /// Human-readable name tying counters to this index via `indexTypeName`.
    pub index_type_name: String,
    /// Numeric indexType, unique per entry definition.
    pub index_type: i32,
    pub index_value_mode: IndexValueMode,
}

/// Errors raised validating index configuration at construction time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexerError {
    #[error("(fieldName, indexTypeName) pair '{0}'/'{1}' is duplicated")]
    DuplicateFieldIndexTypeName(String, String),
    #[error("indexType {0} is used by more than one entry definition")]
    DuplicateIndexType(i32),
    #[error("entry definition for '{0}' has an invalid indexValueMode")]
    InvalidIndexValueMode(String),
}

/// Deterministically projects facts into index entries.
#[derive(Debug, Clone)]
pub struct FactIndexer {
    configs: Vec<IndexFieldConfig>,
    /// Whether to embed the fact payload into each entry (avoids a join at
    /// counter-evaluation time at the cost of index size).
    embed_payload: bool,
}

impl FactIndexer {
    pub fn new(configs: Vec<IndexFieldConfig>, embed_payload: bool) -> Result<Self, IndexerError> {
        let mut seen_pairs = HashSet::new();
        let mut seen_types = HashSet::new();
        for c in &configs {
            if !seen_pairs.insert((c.field_name.clone(), c.index_type_name.clone())) {
                return Err(IndexerError::DuplicateFieldIndexTypeName(
                    c.field_name.clone(),
                    c.index_type_name.clone(),
                ));
            }
            if !seen_types.insert(c.index_type) {
                return Err(IndexerError::DuplicateIndexType(c.index_type));
            }
        }
        Ok(Self {
            configs,
            embed_payload,
        })
    }

    pub fn configs(&self) -> &[IndexFieldConfig] {
        &self.configs
    }

    /// Produces the index entries for one fact. Deterministic: calling
    /// this twice on the same fact yields the same set, modulo entry
    /// ordering.
    pub fn index(&self, fact: &Fact) -> Vec<IndexEntry> {
        let mut out = Vec::new();
        for cfg in &self.configs {
            let Some(value) = fact.field_as_string(&cfg.field_name) else {
                continue; // missing/empty field -> skip
            };
            let Some(dt) = fact.field_as_date(&cfg.date_name) else {
                continue; // invalid/missing date -> skip
            };
            let h = index_key(cfg.index_value_mode, cfg.index_type, &value);
            out.push(IndexEntry {
                id: IndexEntryId {
                    h,
                    f: fact.id.clone(),
                },
                it: cfg.index_type,
                v: value,
                t: fact.t,
                dt,
                c: fact.c,
                d: self.embed_payload.then(|| fact.d.clone()),
            });
        }
        out
    }

    /// `indexType -> [h, ...]`, empty lists omitted. Feeds the counter
    /// evaluator's `$match _id.h ∈ hashValues[indexType]` stage.
    pub fn hash_values_for_search(entries: &[IndexEntry]) -> BTreeMap<i32, Vec<String>> {
        let mut out: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        for e in entries {
            out.entry(e.it).or_default().push(e.id.h.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{Map, json};

    fn config() -> IndexFieldConfig {
        IndexFieldConfig {
            field_name: "account".into(),
            date_name: "txDate".into(),
            index_type_name: "by_account".into(),
            index_type: 1,
            index_value_mode: IndexValueMode::Opaque,
        }
    }

    fn fact(id: &str, account: Option<&str>, date: Option<&str>) -> Fact {
        let mut d = Map::new();
        if let Some(a) = account {
            d.insert("account".into(), json!(a));
        }
        if let Some(dt) = date {
            d.insert("txDate".into(), json!(dt));
        }
        Fact {
            id: id.into(),
            t: 1,
            c: Utc::now(),
            d,
        }
    }

    #[test]
    fn index_is_deterministic() {
        let indexer = FactIndexer::new(vec![config()], false).unwrap();
        let f = fact("f1", Some("acct"), Some("2024-01-01T00:00:00Z"));
        let a = indexer.index(&f);
        let b = indexer.index(&f);
        assert_eq!(a, b);
    }

    #[test]
    fn shared_field_value_shares_hash_key() {
        let indexer = FactIndexer::new(vec![config()], false).unwrap();
        let f1 = fact("f1", Some("shared"), Some("2024-01-01T00:00:00Z"));
        let f2 = fact("f2", Some("shared"), Some("2024-01-01T00:00:00Z"));
        let e1 = indexer.index(&f1);
        let e2 = indexer.index(&f2);
        assert_eq!(e1[0].id.h, e2[0].id.h);
        assert_ne!(e1[0].id.f, e2[0].id.f);
    }

    #[test]
    fn missing_field_skips_entry() {
        let indexer = FactIndexer::new(vec![config()], false).unwrap();
        let f = fact("f1", None, Some("2024-01-01T00:00:00Z"));
        assert!(indexer.index(&f).is_empty());
    }

    #[test]
    fn invalid_date_skips_entry() {
        let indexer = FactIndexer::new(vec![config()], false).unwrap();
        let f = fact("f1", Some("acct"), Some("not-a-date"));
        assert!(indexer.index(&f).is_empty());
    }

    #[test]
    fn construction_rejects_duplicate_index_type() {
        let mut dup = config();
        dup.field_name = "other".into();
        let err = FactIndexer::new(vec![config(), dup], false).unwrap_err();
        assert_eq!(err, IndexerError::DuplicateIndexType(1));
    }

    #[test]
    fn hash_values_for_search_groups_by_index_type() {
        let indexer = FactIndexer::new(vec![config()], false).unwrap();
        let f = fact("f1", Some("acct"), Some("2024-01-01T00:00:00Z"));
        let entries = indexer.index(&f);
        let grouped = FactIndexer::hash_values_for_search(&entries);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[&1].len(), 1);
    }
}
