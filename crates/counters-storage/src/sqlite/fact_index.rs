//! Fact index entry persistence and hash/window candidate queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use counters_core::fact::Fact;
use counters_core::index_entry::{IndexEntry, IndexEntryId};

use crate::error::Result;
use crate::sqlite::facts::scan_fact;
use crate::sqlite::store::SqliteStore;
use crate::traits::TimeWindow;

pub(crate) fn save_entry_on_conn(conn: &Connection, entry: &IndexEntry) -> Result<()> {
    let d_json = match &entry.d {
        Some(d) => Some(serde_json::to_string(d)?),
        None => None,
    };
    conn.execute(
        r#"
        INSERT INTO fact_index (h, f, it, v, t, dt, c, d)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(h, f) DO UPDATE SET
            v = excluded.v, dt = excluded.dt, d = excluded.d
        "#,
        params![
            entry.id.h,
            entry.id.f,
            entry.it,
            entry.v,
            entry.t,
            entry.dt.to_rfc3339(),
            entry.c.to_rfc3339(),
            d_json,
        ],
    )?;
    Ok(())
}

/// Builds `h IN (?, ?, ...) AND it IN (...)` style predicates for a
/// `{indexType -> [h, ...]}` candidate map. Each index type's candidate
/// hashes are ORed together (any entry matching any hash for that type
/// counts), and the index types themselves are ORed too -- a fact is
/// relevant if it has a matching entry under *any* configured index.
fn hash_predicate(hash_values: &BTreeMap<i32, Vec<String>>) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    for hashes in hash_values.values() {
        if hashes.is_empty() {
            continue;
        }
        let placeholders = vec!["?"; hashes.len()].join(", ");
        clauses.push(format!("h IN ({placeholders})"));
        params.extend(hashes.iter().cloned());
    }
    (clauses.join(" OR "), params)
}

/// Fetches up to `row_cap` facts matching any hash in `hash_values` whose
/// entry date falls in `window`, strictly excluding `exclude_fact_id` --
/// the fact being processed is never counted among its own counters.
/// Public so [`crate::sqlite::SqliteStore`] and a dispatcher worker thread
/// holding its own dedicated read-only connection can both call it.
pub fn get_relevant_facts_on_conn(
    conn: &Connection,
    hash_values: &BTreeMap<i32, Vec<String>>,
    window: TimeWindow,
    exclude_fact_id: &str,
    row_cap: usize,
) -> Result<Vec<Fact>> {
    let (predicate, mut bind) = hash_predicate(hash_values);
    if predicate.is_empty() {
        return Ok(Vec::new());
    }

    let from = ms_to_rfc3339(window.from_ms);
    let to = ms_to_rfc3339(window.to_ms);
    bind.push(from);
    bind.push(to);
    bind.push(exclude_fact_id.to_string());

    let sql = format!(
        r#"
        SELECT DISTINCT facts.id, facts.t, facts.c, facts.d
        FROM fact_index
        JOIN facts ON facts.id = fact_index.f
        WHERE ({predicate}) AND fact_index.dt >= ? AND fact_index.dt < ? AND fact_index.f != ?
        ORDER BY fact_index.dt DESC
        LIMIT {row_cap}
        "#
    );

    let params: Vec<&dyn rusqlite::ToSql> = bind.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params.as_slice(), scan_fact)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Count-only sibling of [`get_relevant_facts_on_conn`], also excluding
/// `exclude_fact_id`.
pub fn get_relevant_fact_count_on_conn(
    conn: &Connection,
    hash_values: &BTreeMap<i32, Vec<String>>,
    window: TimeWindow,
    exclude_fact_id: &str,
) -> Result<i64> {
    let (predicate, mut bind) = hash_predicate(hash_values);
    if predicate.is_empty() {
        return Ok(0);
    }

    let from = ms_to_rfc3339(window.from_ms);
    let to = ms_to_rfc3339(window.to_ms);
    bind.push(from);
    bind.push(to);
    bind.push(exclude_fact_id.to_string());

    let sql = format!(
        r#"
        SELECT COUNT(DISTINCT fact_index.f)
        FROM fact_index
        WHERE ({predicate}) AND fact_index.dt >= ? AND fact_index.dt < ? AND fact_index.f != ?
        "#
    );

    let params: Vec<&dyn rusqlite::ToSql> = bind.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    conn.query_row(&sql, params.as_slice(), |row| row.get(0))
        .map_err(Into::into)
}

/// Renders a millisecond-epoch window bound as an RFC3339 literal for
/// comparison against the `dt` column.
///
/// `window.{from_ms,to_ms}` uses `i64::MIN`/`i64::MAX` to mean "this side
/// is unbounded" (see `counters-aggregate`'s window computation), but
/// those sentinels are outside the range `chrono::DateTime<Utc>` can
/// represent -- `from_timestamp_millis` returns `None` for both. Falling
/// back to `Utc::now()` there would silently turn an unbounded window
/// into an empty one (`dt >= now AND dt < now`), excluding every
/// historical fact. Clamp into the representable range instead, so an
/// unbounded side becomes "the earliest/latest timestamp this column can
/// ever hold" rather than "right now".
pub(crate) fn ms_to_rfc3339(ms: i64) -> String {
    let clamped = ms.clamp(
        DateTime::<Utc>::MIN_UTC.timestamp_millis(),
        DateTime::<Utc>::MAX_UTC.timestamp_millis(),
    );
    DateTime::<Utc>::from_timestamp_millis(clamped)
        .expect("clamped into chrono's representable range")
        .to_rfc3339()
}

impl SqliteStore {
    pub fn save_fact_index_list_impl(&self, entries: &[IndexEntry]) -> Result<()> {
        let conn = self.lock_conn()?;
        for entry in entries {
            save_entry_on_conn(&conn, entry)?;
        }
        Ok(())
    }

    pub fn get_relevant_facts_impl(
        &self,
        hash_values: &BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: &str,
        row_cap: usize,
    ) -> Result<Vec<Fact>> {
        let conn = self.lock_conn()?;
        get_relevant_facts_on_conn(&conn, hash_values, window, exclude_fact_id, row_cap)
    }

    pub fn get_relevant_fact_count_impl(
        &self,
        hash_values: &BTreeMap<i32, Vec<String>>,
        window: TimeWindow,
        exclude_fact_id: &str,
    ) -> Result<i64> {
        let conn = self.lock_conn()?;
        get_relevant_fact_count_on_conn(&conn, hash_values, window, exclude_fact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counters_core::index_entry::IndexValueMode;
    use serde_json::{Map, json};

    fn fact(id: &str) -> Fact {
        Fact {
            id: id.into(),
            t: 1,
            c: Utc::now(),
            d: Map::new(),
        }
    }

    fn entry(h: &str, f: &str, it: i32, dt: DateTime<Utc>) -> IndexEntry {
        IndexEntry {
            id: IndexEntryId { h: h.into(), f: f.into() },
            it,
            v: "acct".into(),
            t: 1,
            dt,
            c: Utc::now(),
            d: None,
        }
    }

    #[test]
    fn round_trips_entries_and_narrows_by_hash_and_window() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_fact_impl(&fact("f1")).unwrap();
        store.save_fact_impl(&fact("f2")).unwrap();

        let now = Utc::now();
        store
            .save_fact_index_list_impl(&[
                entry("h1", "f1", 1, now),
                entry("h2", "f2", 1, now - chrono::Duration::days(400)),
            ])
            .unwrap();

        let mut hashes = BTreeMap::new();
        hashes.insert(1, vec!["h1".to_string(), "h2".to_string()]);

        let window = TimeWindow {
            from_ms: (now - chrono::Duration::days(1)).timestamp_millis(),
            to_ms: (now + chrono::Duration::days(1)).timestamp_millis(),
        };

        let facts = store.get_relevant_facts_impl(&hashes, window, "", 10).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].id, "f1");
    }

    #[test]
    fn excludes_the_fact_under_evaluation() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_fact_impl(&fact("f1")).unwrap();
        store.save_fact_impl(&fact("f2")).unwrap();

        let now = Utc::now();
        store
            .save_fact_index_list_impl(&[entry("h1", "f1", 1, now), entry("h1", "f2", 1, now)])
            .unwrap();

        let mut hashes = BTreeMap::new();
        hashes.insert(1, vec!["h1".to_string()]);
        let window = TimeWindow {
            from_ms: (now - chrono::Duration::days(1)).timestamp_millis(),
            to_ms: (now + chrono::Duration::days(1)).timestamp_millis(),
        };

        let facts = store.get_relevant_facts_impl(&hashes, window, "f1", 10).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].id, "f2");

        let count = store.get_relevant_fact_count_impl(&hashes, window, "f1").unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn resaving_entry_updates_value_not_identity() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_fact_impl(&fact("f1")).unwrap();
        let now = Utc::now();
        store.save_fact_index_list_impl(&[entry("h1", "f1", 1, now)]).unwrap();
        let mut updated = entry("h1", "f1", 1, now);
        updated.v = "changed".into();
        store.save_fact_index_list_impl(&[updated]).unwrap();

        let mut hashes = BTreeMap::new();
        hashes.insert(1, vec!["h1".to_string()]);
        let window = TimeWindow {
            from_ms: (now - chrono::Duration::days(1)).timestamp_millis(),
            to_ms: (now + chrono::Duration::days(1)).timestamp_millis(),
        };
        let count = store.get_relevant_fact_count_impl(&hashes, window, "").unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_hash_map_yields_no_candidates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let window = TimeWindow { from_ms: 0, to_ms: i64::MAX };
        let facts = store.get_relevant_facts_impl(&BTreeMap::new(), window, "", 10).unwrap();
        assert!(facts.is_empty());
    }

    /// S1 over the real `SqliteStore`: a counter with `fromTimeMs=0,
    /// toTimeMs=0` (no window) must still see every historical fact, not
    /// zero of them. `i64::MIN`/`i64::MAX` (the sentinels `CounterProducer`
    /// emits for an unbounded side) are outside the range
    /// `DateTime::<Utc>` can represent; a naive fallback to `Utc::now()`
    /// on the unrepresentable bound used to turn this into `dt BETWEEN
    /// now AND now`, excluding every fact.
    #[test]
    fn unbounded_window_sentinel_sees_every_historical_fact() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_fact_impl(&fact("A")).unwrap();
        store.save_fact_impl(&fact("B")).unwrap();
        store.save_fact_impl(&fact("C")).unwrap();
        store.save_fact_impl(&fact("D")).unwrap();

        let now = Utc::now();
        store
            .save_fact_index_list_impl(&[
                entry("shared", "A", 1, now - chrono::Duration::seconds(150)),
                entry("shared", "B", 1, now - chrono::Duration::seconds(90)),
                entry("shared", "C", 1, now - chrono::Duration::seconds(45)),
            ])
            .unwrap();

        let mut hashes = BTreeMap::new();
        hashes.insert(1, vec!["shared".to_string()]);
        let unbounded = TimeWindow { from_ms: i64::MIN, to_ms: i64::MAX };

        let facts = store.get_relevant_facts_impl(&hashes, unbounded, "D", 10).unwrap();
        assert_eq!(facts.len(), 3, "an unbounded window must not silently collapse to `now..now`");

        let count = store.get_relevant_fact_count_impl(&hashes, unbounded, "D").unwrap();
        assert_eq!(count, 3);
    }

    /// Testable Property 7: the window's upper bound is exclusive
    /// (`now - fromTimeMs <= dt < now - toTimeMs`), so a fact whose `dt`
    /// lands exactly on the upper bound must not contribute.
    #[test]
    fn upper_window_bound_is_exclusive() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_fact_impl(&fact("on_bound")).unwrap();
        store.save_fact_impl(&fact("inside")).unwrap();

        let now = Utc::now();
        let to_ms = (now - chrono::Duration::seconds(30)).timestamp_millis();
        store
            .save_fact_index_list_impl(&[
                entry("h1", "on_bound", 1, DateTime::from_timestamp_millis(to_ms).unwrap()),
                entry("h1", "inside", 1, now - chrono::Duration::seconds(31)),
            ])
            .unwrap();

        let mut hashes = BTreeMap::new();
        hashes.insert(1, vec!["h1".to_string()]);
        let window = TimeWindow {
            from_ms: (now - chrono::Duration::seconds(120)).timestamp_millis(),
            to_ms,
        };

        let facts = store.get_relevant_facts_impl(&hashes, window, "", 10).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].id, "inside");
    }
}
