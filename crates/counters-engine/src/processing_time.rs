//! Per-stage latency breakdown for one ingestion request.

use serde::{Deserialize, Serialize};

/// Wall-clock timings for one request, in milliseconds: total, the two
/// concurrent persistence legs, counter evaluation, and the portion of
/// counter evaluation spent waiting on a dispatcher worker versus running
/// the query itself.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessingTime {
    pub total_ms: i64,
    pub save_fact_ms: i64,
    pub save_index_ms: i64,
    pub counters_ms: i64,
    pub worker_wait_ms: i64,
    pub query_time_ms: i64,
}

/// Counters the pipeline records about its own degraded paths --
/// back-pressure and per-query timeouts never surface as request errors,
/// only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub no_available_workers: u64,
    pub counter_timeouts: u64,
    pub info: Vec<String>,
}

impl Metrics {
    pub fn record_no_available_workers(&mut self, counter_names: &[String]) {
        self.no_available_workers += 1;
        self.info
            .push(format!("no worker available for counters {counter_names:?}"));
    }

    pub fn record_counter_timeout(&mut self, counter_names: &[String]) {
        self.counter_timeouts += 1;
        self.info.push(format!("counters {counter_names:?} timed out"));
    }
}
