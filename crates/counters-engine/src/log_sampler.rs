//! [`DebugLogSampler`] -- keeps only the single worst request per
//! `LOG_SAVE_FREQUENCY`-sized window.

use std::sync::Mutex;

use counters_storage::{LogEntry, StorageLayer};

struct SamplerState {
    request_counter: u64,
    window_start: u64,
    worst: Option<(i64, serde_json::Value)>,
}

/// Per-process worst-of-window sampler. One instance is shared across all
/// ingestion requests in a process; its internal state is a small mutex,
/// never contended for long since the critical section does no I/O.
pub struct DebugLogSampler {
    log_save_frequency: u64,
    state: Mutex<SamplerState>,
}

impl DebugLogSampler {
    pub fn new(log_save_frequency: u64) -> Self {
        Self {
            log_save_frequency: log_save_frequency.max(1),
            state: Mutex::new(SamplerState {
                request_counter: 0,
                window_start: 0,
                worst: None,
            }),
        }
    }

    /// Records one completed request. `detail` is whatever the caller
    /// wants preserved for the worst request in the window (message,
    /// fact, timings, metrics, debug info, already flattened to JSON).
    /// Writes via `storage.save_log` only when the window closes; the
    /// write is fire-and-forget, and a failure is logged, never propagated.
    pub fn record(&self, storage: &dyn StorageLayer, total_ms: i64, detail: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        state.request_counter += 1;

        let replace = match &state.worst {
            None => true,
            Some((worst_ms, _)) => total_ms > *worst_ms,
        };
        if replace {
            state.worst = Some((total_ms, detail));
        }

        if state.request_counter < self.log_save_frequency {
            return;
        }

        let window_end = state.window_start + state.request_counter;
        if let Some((worst_ms, worst_detail)) = state.worst.take() {
            let entry = LogEntry {
                window_start: state.window_start,
                window_end,
                worst_millis: worst_ms,
                detail: worst_detail,
            };
            if let Err(e) = storage.save_log(&entry) {
                tracing::warn!(error = %e, "failed to persist debug log sample");
            }
        }
        state.window_start = window_end;
        state.request_counter = 0;
    }
}
