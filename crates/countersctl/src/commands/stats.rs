//! `countersctl stats` -- summary row counts for the store.
//!
//! Opens its own read-only connection directly, rather than going through
//! [`counters_storage::StorageLayer`] (which has no "count everything"
//! operation -- that's intentionally outside its scope).

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::context::RuntimeContext;

#[derive(Debug, Serialize)]
struct Stats {
    facts: i64,
    index_entries: i64,
    log_entries: i64,
}

pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let conn = Connection::open_with_flags(&ctx.db, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("opening {} read-only", ctx.db.display()))?;

    let stats = Stats {
        facts: count(&conn, "facts")?,
        index_entries: count(&conn, "fact_index")?,
        log_entries: count(&conn, "log")?,
    };

    if ctx.json {
        crate::output::print_json(&stats);
    } else {
        println!("facts:         {}", stats.facts);
        println!("index entries: {}", stats.index_entries);
        println!("log entries:   {}", stats.log_entries);
    }
    Ok(())
}

fn count(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    conn.query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("counting rows in {table}"))
}
