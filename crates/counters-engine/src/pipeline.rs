//! [`IngestionPipeline`] -- maps, indexes, persists, and scores one
//! message end to end.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;

use counters_core::fact::Fact;
use counters_core::index_entry::IndexEntry;
use counters_core::indexer::FactIndexer;
use counters_core::mapper::FactMapper;
use counters_core::message::InboundMessage;
use counters_storage::{SaveOutcome, StorageLayer};

use counters_aggregate::{CounterProducer, execute_job};
use counters_dispatch::{DispatchError, QueryDispatcher, QueryResult};

use crate::error::IngestionError;
use crate::log_sampler::DebugLogSampler;
use crate::processing_time::{Metrics, ProcessingTime};

/// Returned from one ingestion request: the mapped fact, every counter's
/// computed attributes keyed by counter name, the latency breakdown, and
/// the degraded-path metrics.
#[derive(Debug, Clone)]
pub struct IngestionResult {
    pub fact: Fact,
    /// Whether `saveFact` inserted a new fact, updated an existing one,
    /// or left it untouched because the incoming fact was already
    /// identical -- see spec §4.5 and scenario S4.
    pub save_fact_result: SaveOutcome,
    pub counters: BTreeMap<String, BTreeMap<String, Value>>,
    pub processing_time: ProcessingTime,
    pub metrics: Metrics,
    pub debug: Option<Value>,
}

/// Tuning knobs for the counter-dispatch step: how long to wait for a
/// free worker, and how long to wait for that worker's query to finish.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTimeouts {
    pub worker_acquire_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for DispatchTimeouts {
    fn default() -> Self {
        Self {
            worker_acquire_timeout: Duration::from_millis(250),
            query_timeout: Duration::from_secs(5),
        }
    }
}

/// Orchestrates `FactMapper -> FactIndexer -> StorageLayer ->
/// CounterProducer -> DebugLogSampler` end to end for one request.
pub struct IngestionPipeline<S: StorageLayer> {
    mapper: FactMapper,
    indexer: FactIndexer,
    storage: Arc<S>,
    producer: CounterProducer,
    /// When set, counter fetches are fanned out across this worker pool
    /// instead of running in-process against `storage`'s own connection
    /// -- see DESIGN.md's Open Question resolution on why this is
    /// optional rather than mandatory.
    dispatcher: Option<Arc<QueryDispatcher>>,
    dispatch_timeouts: DispatchTimeouts,
    log_sampler: DebugLogSampler,
    allowed_message_types: Option<Vec<i32>>,
}

const UNCAPPED_FETCH_LIMIT: usize = 10_000;

impl<S: StorageLayer + 'static> IngestionPipeline<S> {
    pub fn new(
        mapper: FactMapper,
        indexer: FactIndexer,
        storage: Arc<S>,
        producer: CounterProducer,
        log_save_frequency: u64,
        allowed_message_types: Option<Vec<i32>>,
    ) -> Self {
        Self {
            mapper,
            indexer,
            storage,
            producer,
            dispatcher: None,
            dispatch_timeouts: DispatchTimeouts::default(),
            log_sampler: DebugLogSampler::new(log_save_frequency),
            allowed_message_types,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<QueryDispatcher>, timeouts: DispatchTimeouts) -> Self {
        self.dispatcher = Some(dispatcher);
        self.dispatch_timeouts = timeouts;
        self
    }

    /// Runs one message through the full pipeline: allowlist check, map,
    /// index, persist, evaluate counters, sample the request for the
    /// debug log.
    pub fn ingest(&self, message: &InboundMessage, now: DateTime<Utc>) -> Result<IngestionResult, IngestionError> {
        let t0 = Instant::now();

        if let Some(allowed) = &self.allowed_message_types {
            if !allowed.contains(&message.t) {
                return Err(IngestionError::Validation(format!(
                    "message type {} is not in the allowed set",
                    message.t
                )));
            }
        }

        // Step 2: map. Rejects with no persistence on any mapping error.
        let fact = self.mapper.map(message, now)?;

        // Step 3: index.
        let entries = self.indexer.index(&fact);

        // Step 4: saveFact / saveFactIndexList, concurrently, each with
        // one retry on a transient error.
        let (save_fact_ms, save_index_ms, save_fact_result) = self.persist(&fact, &entries)?;

        // Step 5 (hashValues) is folded into step 6: `CounterProducer::plan_for_fact`
        // derives each bucket's hash values itself via `FactIndexer::hash_values_for_search`.

        // Step 6: counters, best-effort.
        let counters_t0 = Instant::now();
        let mut metrics = Metrics::default();
        let mut worker_wait_ms = 0i64;
        let mut query_time_ms = 0i64;
        let counters = self.evaluate_counters(&fact, &entries, now, &mut metrics, &mut worker_wait_ms, &mut query_time_ms);
        let counters_ms = counters_t0.elapsed().as_millis() as i64;

        let processing_time = ProcessingTime {
            total_ms: t0.elapsed().as_millis() as i64,
            save_fact_ms,
            save_index_ms,
            counters_ms,
            worker_wait_ms,
            query_time_ms,
        };

        let result = IngestionResult {
            fact,
            save_fact_result,
            counters,
            processing_time,
            metrics,
            debug: None,
        };

        // Step 8: forward to the debug log sampler.
        let detail = serde_json::json!({
            "message": message,
            "factId": result.fact.id,
            "processingTime": result.processing_time,
            "metrics": result.metrics,
        });
        self.log_sampler.record(self.storage.as_ref(), result.processing_time.total_ms, detail);

        Ok(result)
    }

    fn persist(&self, fact: &Fact, entries: &[IndexEntry]) -> Result<(i64, i64, SaveOutcome), IngestionError> {
        let mut save_fact_ms = 0i64;
        let mut save_index_ms = 0i64;
        let mut fact_result = None;
        let mut index_err = None;

        std::thread::scope(|scope| {
            let fact_handle = scope.spawn(|| {
                let t0 = Instant::now();
                let result = save_with_retry(|| self.storage.save_fact(fact));
                (t0.elapsed().as_millis() as i64, result)
            });
            let index_handle = scope.spawn(|| {
                let t0 = Instant::now();
                let result = save_with_retry(|| self.storage.save_fact_index_list(entries));
                (t0.elapsed().as_millis() as i64, result)
            });

            let (ms, result) = fact_handle.join().expect("saveFact thread panicked");
            save_fact_ms = ms;
            fact_result = Some(result);

            let (ms, result) = index_handle.join().expect("saveFactIndexList thread panicked");
            save_index_ms = ms;
            index_err = result.err();
        });

        let save_fact_outcome = match fact_result.expect("saveFact always sets a result") {
            Ok(outcome) => outcome,
            Err(e) => return Err(IngestionError::Persistence(format!("saveFact: {e}"))),
        };
        if let Some(e) = index_err {
            return Err(IngestionError::Persistence(format!("saveFactIndexList: {e}")));
        }
        Ok((save_fact_ms, save_index_ms, save_fact_outcome))
    }

    fn evaluate_counters(
        &self,
        fact: &Fact,
        entries: &[IndexEntry],
        now: DateTime<Utc>,
        metrics: &mut Metrics,
        worker_wait_ms: &mut i64,
        query_time_ms: &mut i64,
    ) -> BTreeMap<String, BTreeMap<String, Value>> {
        let jobs = self.producer.plan_for_fact(&fact.id, entries, now);
        let mut out = BTreeMap::new();

        for job in &jobs {
            let fetch_cap = if job.max_evaluated_records > 0 {
                job.max_evaluated_records
            } else {
                UNCAPPED_FETCH_LIMIT
            };
            let counter_names: Vec<String> = job.counters.iter().map(|c| c.name.clone()).collect();

            let facts = match &self.dispatcher {
                Some(dispatcher) => {
                    let hash_values = job.hash_values.clone();
                    let window = job.window;
                    let exclude = job.exclude_fact_id.clone();
                    let query_job: counters_dispatch::Job = Box::new(move |conn| {
                        counters_storage::sqlite::get_relevant_facts_on_conn(conn, &hash_values, window, &exclude, fetch_cap)
                            .map(QueryResult::Facts)
                    });

                    let wait_t0 = Instant::now();
                    let submission = dispatcher.submit(
                        query_job,
                        self.dispatch_timeouts.worker_acquire_timeout,
                        self.dispatch_timeouts.query_timeout,
                    );
                    *worker_wait_ms += wait_t0.elapsed().as_millis() as i64;

                    match submission {
                        Ok(QueryResult::Facts(facts)) => Some(facts),
                        Ok(QueryResult::Count(_)) => None,
                        Err(DispatchError::NoAvailableWorkers) => {
                            metrics.record_no_available_workers(&counter_names);
                            None
                        }
                        Err(DispatchError::Timeout) => {
                            metrics.record_counter_timeout(&counter_names);
                            None
                        }
                        Err(DispatchError::Closed) | Err(DispatchError::Storage(_)) => None,
                    }
                }
                None => {
                    let query_t0 = Instant::now();
                    let result = self
                        .storage
                        .get_relevant_facts(&job.hash_values, job.window, &job.exclude_fact_id, fetch_cap)
                        .ok();
                    *query_time_ms += query_t0.elapsed().as_millis() as i64;
                    result
                }
            };

            if let Some(facts) = facts {
                for counter_result in execute_job(job, &facts, now) {
                    out.insert(counter_result.name, counter_result.attributes);
                }
            }
            // absent counters (fetch failure, worker exhaustion, timeout) are
            // simply omitted from `out`.
        }

        out
    }
}

fn save_with_retry<T, F>(mut op: F) -> counters_storage::error::Result<T>
where
    F: FnMut() -> counters_storage::error::Result<T>,
{
    match op() {
        Ok(v) => Ok(v),
        Err(e) if e.is_retryable() => op(),
        Err(e) => Err(e),
    }
}
