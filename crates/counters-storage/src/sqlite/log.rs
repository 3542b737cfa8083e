//! Debug log persistence -- one row per sampled "worst of window" request.

use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::sqlite::store::SqliteStore;
use crate::traits::LogEntry;

pub(crate) fn save_log_on_conn(conn: &Connection, entry: &LogEntry) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO log (saved_at, window_start, window_end, worst_millis, detail)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            Utc::now().to_rfc3339(),
            entry.window_start as i64,
            entry.window_end as i64,
            entry.worst_millis,
            entry.detail.to_string(),
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    pub fn save_log_impl(&self, entry: &LogEntry) -> Result<()> {
        let conn = self.lock_conn()?;
        save_log_on_conn(&conn, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_log_inserts_a_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save_log_impl(&LogEntry {
                window_start: 0,
                window_end: 100,
                worst_millis: 42,
                detail: json!({"messageType": 1}),
            })
            .unwrap();

        let conn = store.lock_conn().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM log", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
