//! The unit of work a dispatcher worker executes against its dedicated
//! read-only connection.

use rusqlite::Connection;

use counters_core::fact::Fact;
use counters_storage::error::Result as StorageResult;

/// What a job produces: either materialized facts or a bare count,
/// mirroring [`counters_storage::StorageLayer::get_relevant_facts`] and
/// [`counters_storage::StorageLayer::get_relevant_fact_count`].
#[derive(Debug, Clone)]
pub enum QueryResult {
    Facts(Vec<Fact>),
    Count(i64),
}

/// A boxed unit of work. Built by the caller (typically
/// `counters-aggregate`'s planner via a thin adapter), run by whichever
/// worker thread picks it up, against that worker's own connection.
pub type Job = Box<dyn FnOnce(&Connection) -> StorageResult<QueryResult> + Send>;
