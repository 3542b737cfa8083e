//! QueryDispatcher: a fixed pool of read-only SQLite worker threads that
//! execute counter queries and route results back to their caller by
//! `queryId`.
//!
//! Callers never touch a [`rusqlite::Connection`] directly; they build a
//! [`Job`] closure (typically one that calls into
//! `counters_storage::sqlite::get_relevant_facts_on_conn` or its count
//! sibling) and hand it to [`QueryDispatcher::submit`].

mod dispatcher;
mod error;
mod job;
mod query_id;
mod semaphore;

pub use dispatcher::QueryDispatcher;
pub use error::DispatchError;
pub use job::{Job, QueryResult};
pub use query_id::QueryIdGenerator;
pub use semaphore::Semaphore;
