//! [`QueryDispatcher`] -- a bounded pool of worker threads, each holding
//! its own read-only SQLite connection, routing results back to callers
//! by `queryId`.
//!
//! Submission is synchronous from the caller's point of view
//! ([`QueryDispatcher::submit`] blocks until a result, a per-query
//! timeout, or worker-acquire backpressure resolves the call) but the
//! work itself always executes on a worker thread against its dedicated
//! connection, never inline on the caller's thread -- this is what lets
//! many counters across many in-flight ingestion requests share one
//! small, bounded set of database connections.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use counters_storage::StorageError;

use crate::error::DispatchError;
use crate::job::{Job, QueryResult};
use crate::query_id::QueryIdGenerator;
use crate::semaphore::Semaphore;

struct WorkItem {
    query_id: u64,
    job: Job,
}

type PendingMap = Arc<Mutex<HashMap<u64, mpsc::Sender<counters_storage::error::Result<QueryResult>>>>>;

/// Bounded thread pool of read-only SQLite workers plus the routing
/// machinery described in the module docs.
pub struct QueryDispatcher {
    job_tx: mpsc::Sender<WorkItem>,
    pending: PendingMap,
    semaphore: Arc<Semaphore>,
    ids: QueryIdGenerator,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl QueryDispatcher {
    /// Spawns `pool_size` worker threads, each opening its own read-only
    /// connection against the SQLite file at `db_path`. WAL mode must
    /// already be enabled on that file (the writer side, `SqliteStore`,
    /// guarantees this) or these readers will contend with the writer.
    pub fn new(db_path: impl AsRef<Path>, pool_size: usize) -> counters_storage::error::Result<Self> {
        assert!(pool_size > 0, "a dispatcher needs at least one worker");

        let (job_tx, job_rx) = mpsc::channel::<WorkItem>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(pool_size);
        for idx in 0..pool_size {
            let conn = Connection::open_with_flags(
                db_path.as_ref(),
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| StorageError::Connection(format!("worker {idx}: {e}")))?;

            let job_rx = job_rx.clone();
            let pending = pending.clone();
            let shutdown = shutdown.clone();
            workers.push(thread::spawn(move || worker_loop(idx, conn, job_rx, pending, shutdown)));
        }

        Ok(Self {
            job_tx,
            pending,
            semaphore: Arc::new(Semaphore::new(pool_size)),
            ids: QueryIdGenerator::new(),
            workers,
            shutdown,
        })
    }

    /// Submits `job`, blocking until it completes, its individual timeout
    /// elapses, or no worker frees up within `worker_acquire_timeout`.
    ///
    /// On [`DispatchError::Timeout`] the job may still run to completion
    /// later; its result is delivered to nobody and dropped without being
    /// logged as an "unknown query" -- that was specifically the noise
    /// this router must not reproduce.
    pub fn submit(
        &self,
        job: Job,
        worker_acquire_timeout: Duration,
        query_timeout: Duration,
    ) -> Result<QueryResult, DispatchError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(DispatchError::Closed);
        }
        if !self.semaphore.acquire_timeout(worker_acquire_timeout) {
            return Err(DispatchError::NoAvailableWorkers);
        }

        let query_id = self.ids.next();
        let (result_tx, result_rx) = mpsc::channel();
        self.pending.lock().unwrap().insert(query_id, result_tx);

        if self.job_tx.send(WorkItem { query_id, job }).is_err() {
            self.pending.lock().unwrap().remove(&query_id);
            self.semaphore.release();
            return Err(DispatchError::Closed);
        }

        let outcome = result_rx.recv_timeout(query_timeout);
        self.semaphore.release();

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(storage_err)) => {
                warn!(query_id, error = %storage_err, "counter query failed");
                Err(DispatchError::Storage(storage_err))
            }
            Err(RecvTimeoutError::Timeout) => {
                // Remove our own entry so a late-arriving result has
                // nowhere to go and is dropped in the worker loop instead
                // of misrouting to a future query reusing this id.
                self.pending.lock().unwrap().remove(&query_id);
                Err(DispatchError::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::Closed),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(
    idx: usize,
    conn: Connection,
    job_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    pending: PendingMap,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        let item = {
            let rx = job_rx.lock().unwrap();
            rx.recv()
        };
        let Ok(WorkItem { query_id, job }) = item else {
            debug!(worker = idx, "job channel closed, worker exiting");
            return;
        };
        if shutdown.load(Ordering::Acquire) {
            return;
        }

        let result = job(&conn);

        // Route the result if, and only if, the submitter is still
        // waiting. A missing entry means the query already timed out;
        // the result is discarded here, deliberately without a log line.
        if let Some(tx) = pending.lock().unwrap().remove(&query_id) {
            let _ = tx.send(result);
        }
    }
}

impl Drop for QueryDispatcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        // Dropping job_tx (the dispatcher's only sender) closes the
        // channel; each worker's blocking recv() then returns an error
        // and the thread exits its loop on its own.
        drop(std::mem::replace(&mut self.job_tx, mpsc::channel().0));
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
