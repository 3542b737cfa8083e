//! Models the aggregation pipeline as explicit Rust stages.
//!
//! A document-database aggregation pipeline for this workload looks like
//! `$match` (hash + window, excluding the fact under evaluation) -> `$limit`
//! (`maxEvaluatedRecords`) -> `$lookup`/`$unwind` (embed or join fact
//! content) -> `$facet` (run every counter sharing this match/limit pair as
//! its own named sub-pipeline, each applying its own `computationConditions`
//! / `maxMatchingRecords` / `evaluationConditions` / `$group`). Rather than
//! building literal pipeline documents, each stage is a typed value the
//! executor in [`crate::producer`] walks directly.

use std::collections::BTreeMap;

use counters_storage::TimeWindow;

/// One pipeline run: the shared narrowing stages plus the named facets
/// (counter definitions) that consume the narrowed set.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub query_id: u64,
    pub r#match: MatchStage,
    /// `maxEvaluatedRecords` -- the shared fetch's row cap, `None` if uncapped.
    pub limit: Option<usize>,
    pub facets: Vec<String>,
}

/// The `$match` stage: candidates are fact-index rows whose hash is in
/// `hash_values` (keyed by index type), whose domain date falls in
/// `window`, and whose owning fact isn't `exclude_fact_id`.
#[derive(Debug, Clone)]
pub struct MatchStage {
    pub hash_values: BTreeMap<i32, Vec<String>>,
    pub window: TimeWindow,
    pub exclude_fact_id: String,
}

impl Pipeline {
    pub fn new(
        query_id: u64,
        hash_values: BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: impl Into<String>,
    ) -> Self {
        Self {
            query_id,
            r#match: MatchStage {
                hash_values,
                window,
                exclude_fact_id: exclude_fact_id.into(),
            },
            limit: None,
            facets: Vec::new(),
        }
    }

    pub fn with_limit(mut self, max_evaluated_records: usize) -> Self {
        if max_evaluated_records > 0 {
            self.limit = Some(max_evaluated_records);
        }
        self
    }

    pub fn with_facet(mut self, counter_name: impl Into<String>) -> Self {
        self.facets.push(counter_name.into());
        self
    }
}
