//! [`CounterProducer`] -- selects and plans the counters relevant to one
//! freshly-ingested fact, and evaluates a planned job's result once its
//! candidate facts have been fetched.
//!
//! Planning (which buckets, which `queryId`s, which conditions/attributes)
//! is pure and has no storage dependency, so it can run once and have its
//! resulting jobs executed either synchronously against a
//! [`counters_storage::StorageLayer`] (see [`CounterProducer::evaluate_for_fact`],
//! used directly and by tests) or fanned out across a worker pool (see the
//! `counters-engine`/`counters-dispatch` crates) -- the planning step and
//! the execution step never need to agree on a threading model.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use counters_core::fact::Fact;
use counters_core::index_entry::IndexEntry;
use counters_core::indexer::IndexFieldConfig;
use counters_query::{Condition, EvalContext};
use counters_storage::{StorageLayer, TimeWindow};

use crate::types::{AggregateError, AggregationExpr, CounterDefinition, CounterResult};

/// A counter definition's conditions, parsed once at construction time so
/// a typo in a counter's condition document surfaces immediately rather
/// than on the first fact that happens to reach it.
struct CompiledCounter {
    def: CounterDefinition,
    computation: Option<Condition>,
    evaluation: Option<Condition>,
}

/// One counter's narrowing/aggregation instructions, fully owned so a
/// [`PlannedJob`] can cross a thread boundary to a dispatcher worker.
#[derive(Debug, Clone)]
pub struct PlannedCounter {
    pub name: String,
    pub computation: Option<Condition>,
    pub max_matching_records: usize,
    pub evaluation: Option<Condition>,
    pub attributes: BTreeMap<String, AggregationExpr>,
}

/// One shared storage fetch (the bucket-level `$match`/`$limit` stages)
/// plus the counters that consume its result independently.
#[derive(Debug, Clone)]
pub struct PlannedJob {
    pub query_id: u64,
    pub hash_values: BTreeMap<i32, Vec<String>>,
    pub window: TimeWindow,
    pub exclude_fact_id: String,
    pub max_evaluated_records: usize,
    pub counters: Vec<PlannedCounter>,
}

/// Facts considered for a bucket without an explicit row cap still need
/// some bound.
const UNCAPPED_FETCH_LIMIT: usize = 10_000;

/// Groups counter definitions that share an index type, window, and
/// evaluated-record cap into one storage fetch, and plans their evaluation
/// against freshly ingested facts.
pub struct CounterProducer {
    counters: Vec<CompiledCounter>,
    /// `index_type_name -> numeric index type`, resolved from the
    /// indexer's field configuration.
    index_types_by_name: HashMap<String, i32>,
    next_query_id: AtomicU64,
}

impl CounterProducer {
    pub fn new(
        definitions: Vec<CounterDefinition>,
        index_configs: &[IndexFieldConfig],
    ) -> Result<Self, AggregateError> {
        let mut seen_names = std::collections::HashSet::new();
        let mut index_types_by_name = HashMap::new();
        for cfg in index_configs {
            index_types_by_name.insert(cfg.index_type_name.clone(), cfg.index_type);
        }

        let mut counters = Vec::with_capacity(definitions.len());
        for def in definitions {
            if !seen_names.insert(def.name.clone()) {
                return Err(AggregateError::DuplicateCounterName(def.name));
            }
            if !index_types_by_name.contains_key(&def.index_type_name) {
                return Err(AggregateError::UnknownIndexType(
                    def.name,
                    def.index_type_name,
                ));
            }
            let computation = match &def.computation_conditions {
                Some(doc) => Some(Condition::from_json(doc).map_err(|e| {
                    AggregateError::InvalidComputationCondition(def.name.clone(), e.to_string())
                })?),
                None => None,
            };
            let evaluation = match &def.evaluation_conditions {
                Some(doc) => Some(Condition::from_json(doc).map_err(|e| {
                    AggregateError::InvalidEvaluationCondition(def.name.clone(), e.to_string())
                })?),
                None => None,
            };
            counters.push(CompiledCounter {
                def,
                computation,
                evaluation,
            });
        }

        Ok(Self {
            counters,
            index_types_by_name,
            next_query_id: AtomicU64::new(1),
        })
    }

    /// Groups the counter definitions applicable to `fact`'s just-built
    /// index entries into planned storage fetches. Pure: no I/O happens
    /// here, only condition compilation has already happened (at
    /// construction time) and bucket/window/`queryId` assignment happens
    /// now.
    pub fn plan_for_fact(
        &self,
        exclude_fact_id: &str,
        entries: &[IndexEntry],
        now: DateTime<Utc>,
    ) -> Vec<PlannedJob> {
        let entry_by_it: HashMap<i32, &IndexEntry> = entries.iter().map(|e| (e.it, e)).collect();

        let mut buckets: HashMap<(String, i64, i64, usize), Vec<&CompiledCounter>> = HashMap::new();
        for c in &self.counters {
            let Some(&it) = self.index_types_by_name.get(&c.def.index_type_name) else {
                continue;
            };
            if !entry_by_it.contains_key(&it) {
                continue; // this fact has no value for the counter's index field
            }
            buckets.entry(c.def.bucket_key()).or_default().push(c);
        }

        let now_ms = now.timestamp_millis();
        let mut jobs = Vec::new();
        for ((index_type_name, from_time_ms, to_time_ms, max_evaluated_records), bucket) in buckets {
            let it = self.index_types_by_name[&index_type_name];
            let entry = entry_by_it[&it];

            let mut hash_values = BTreeMap::new();
            hash_values.insert(it, vec![entry.id.h.clone()]);

            let window = TimeWindow {
                from_ms: if from_time_ms == 0 { i64::MIN } else { now_ms - from_time_ms },
                to_ms: if to_time_ms == 0 { i64::MAX } else { now_ms - to_time_ms },
            };

            let query_id = self.next_query_id.fetch_add(1, Ordering::Relaxed);
            let counters = bucket
                .iter()
                .map(|c| PlannedCounter {
                    name: c.def.name.clone(),
                    computation: c.computation.clone(),
                    max_matching_records: c.def.max_matching_records,
                    evaluation: c.evaluation.clone(),
                    attributes: c.def.attributes.clone(),
                })
                .collect();

            jobs.push(PlannedJob {
                query_id,
                hash_values,
                window,
                exclude_fact_id: exclude_fact_id.to_string(),
                max_evaluated_records,
                counters,
            });
        }

        jobs
    }

    /// Plans and evaluates every applicable counter synchronously against
    /// `storage`, one bucket fetch at a time. Convenient for tests and for
    /// callers that don't need the dispatcher's parallelism.
    pub fn evaluate_for_fact(
        &self,
        exclude_fact_id: &str,
        entries: &[IndexEntry],
        storage: &dyn StorageLayer,
        now: DateTime<Utc>,
    ) -> Result<Vec<CounterResult>, AggregateError> {
        let jobs = self.plan_for_fact(exclude_fact_id, entries, now);
        let mut results = Vec::new();
        for job in &jobs {
            let fetch_cap = if job.max_evaluated_records > 0 {
                job.max_evaluated_records
            } else {
                UNCAPPED_FETCH_LIMIT
            };
            let facts = storage
                .get_relevant_facts(&job.hash_values, job.window, &job.exclude_fact_id, fetch_cap)
                .map_err(|e| {
                    AggregateError::InvalidComputationCondition(
                        job.counters.first().map(|c| c.name.clone()).unwrap_or_default(),
                        e.to_string(),
                    )
                })?;
            results.extend(execute_job(job, &facts, now));
        }
        Ok(results)
    }
}

/// Evaluates every counter in `job` against the already-fetched candidate
/// `facts`: applies `computationConditions`, caps at `maxMatchingRecords`,
/// applies `evaluationConditions`, then computes `attributes`.
pub fn execute_job(job: &PlannedJob, facts: &[Fact], now: DateTime<Utc>) -> Vec<CounterResult> {
    let ctx = EvalContext::new(now);
    let mut results = Vec::with_capacity(job.counters.len());

    for counter in &job.counters {
        let mut matching: Vec<&Fact> = match &counter.computation {
            None => facts.iter().collect(),
            Some(cond) => facts.iter().filter(|f| counters_query::matches(cond, &f.d, &ctx)).collect(),
        };

        if counter.max_matching_records > 0 && matching.len() > counter.max_matching_records {
            matching.truncate(counter.max_matching_records);
        }

        if let Some(cond) = &counter.evaluation {
            matching.retain(|f| counters_query::matches(cond, &f.d, &ctx));
        }

        let attributes = compute_attributes(&counter.attributes, &matching);
        results.push(CounterResult {
            name: counter.name.clone(),
            query_id: job.query_id,
            attributes,
        });
    }

    results
}

fn compute_attributes(
    attrs: &BTreeMap<String, AggregationExpr>,
    facts: &[&Fact],
) -> BTreeMap<String, serde_json::Value> {
    attrs
        .iter()
        .map(|(name, expr)| (name.clone(), compute_one(expr, facts)))
        .collect()
}

fn compute_one(expr: &AggregationExpr, facts: &[&Fact]) -> serde_json::Value {
    match expr {
        AggregationExpr::Count => serde_json::Value::from(facts.len() as i64),
        AggregationExpr::Sum(field) => serde_json::json!(sum_field(facts, field)),
        AggregationExpr::Avg(field) => {
            if facts.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::json!(sum_field(facts, field) / facts.len() as f64)
            }
        }
        AggregationExpr::Min(field) => numeric_fold(facts, field, f64::min),
        AggregationExpr::Max(field) => numeric_fold(facts, field, f64::max),
    }
}

fn field_as_f64(fact: &Fact, field: &str) -> Option<f64> {
    fact.field(field).and_then(|v| v.as_f64())
}

fn sum_field(facts: &[&Fact], field: &str) -> f64 {
    facts.iter().filter_map(|f| field_as_f64(f, field)).sum()
}

fn numeric_fold(facts: &[&Fact], field: &str, op: fn(f64, f64) -> f64) -> serde_json::Value {
    facts
        .iter()
        .filter_map(|f| field_as_f64(f, field))
        .reduce(op)
        .map(|v| serde_json::json!(v))
        .unwrap_or(serde_json::Value::Null)
}
