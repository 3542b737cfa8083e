//! Errors raised while submitting or awaiting dispatched queries.

/// Errors a caller of [`crate::QueryDispatcher::submit`] can observe.
///
/// Per the dispatcher's failure policy, neither variant is meant to reach
/// an end user directly: [`Self::NoAvailableWorkers`] and [`Self::Timeout`]
/// both degrade to "this counter came back empty" one layer up, with the
/// detail recorded only as a metric/log, never surfaced as a request error.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No worker slot freed up within `workerAcquireTimeout`.
    #[error("no worker available within the acquire timeout")]
    NoAvailableWorkers,
    /// The query's individual timeout elapsed before a worker replied.
    /// The job may still complete later; its result is dropped silently
    /// when it does (see [`crate::dispatcher`] module docs).
    #[error("query timed out waiting for a worker")]
    Timeout,
    /// The dispatcher has been shut down and no longer accepts submissions.
    #[error("dispatcher is shut down")]
    Closed,
    /// The job itself failed once a worker ran it.
    #[error("query failed: {0}")]
    Storage(#[from] counters_storage::StorageError),
}
