//! Fact CRUD operations for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use counters_core::fact::Fact;

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;
use crate::traits::SaveOutcome;

pub(crate) fn scan_fact(row: &Row<'_>) -> rusqlite::Result<Fact> {
    let id: String = row.get("id")?;
    let t: i32 = row.get("t")?;
    let c_str: String = row.get("c")?;
    let d_str: String = row.get("d")?;

    let c = DateTime::parse_from_rfc3339(&c_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let d = serde_json::from_str(&d_str).unwrap_or_default();

    Ok(Fact { id, t, c, d })
}

/// Idempotently upserts `fact`, reporting whether the row was new,
/// changed, or already identical. The existing row (if any) is read
/// first so the three outcomes can be told apart -- the upsert itself
/// can't distinguish "changed" from "identical" on its own.
pub(crate) fn save_fact_on_conn(conn: &Connection, fact: &Fact) -> Result<SaveOutcome> {
    let d_json = serde_json::to_string(&fact.d)?;

    let existing: Option<(i32, String)> = conn
        .query_row("SELECT t, d FROM facts WHERE id = ?1", params![fact.id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;

    match existing {
        None => {
            conn.execute(
                "INSERT INTO facts (id, t, c, d) VALUES (?1, ?2, ?3, ?4)",
                params![fact.id, fact.t, fact.c.to_rfc3339(), d_json],
            )?;
            Ok(SaveOutcome::Inserted)
        }
        Some((t, d)) if t == fact.t && d == d_json => Ok(SaveOutcome::Ignored),
        Some(_) => {
            conn.execute(
                "UPDATE facts SET t = ?2, d = ?3 WHERE id = ?1",
                params![fact.id, fact.t, d_json],
            )?;
            Ok(SaveOutcome::Updated)
        }
    }
}

pub(crate) fn get_fact_on_conn(conn: &Connection, id: &str) -> Result<Fact> {
    conn.query_row("SELECT id, t, c, d FROM facts WHERE id = ?1", params![id], scan_fact)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("fact", id),
            other => StorageError::Query(other),
        })
}

impl SqliteStore {
    pub fn save_fact_impl(&self, fact: &Fact) -> Result<SaveOutcome> {
        let conn = self.lock_conn()?;
        save_fact_on_conn(&conn, fact)
    }

    pub fn get_fact_impl(&self, id: &str) -> Result<Fact> {
        let conn = self.lock_conn()?;
        get_fact_on_conn(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn fact(id: &str) -> Fact {
        let mut d = Map::new();
        d.insert("amount".into(), json!(10));
        Fact {
            id: id.into(),
            t: 1,
            c: Utc::now(),
            d,
        }
    }

    #[test]
    fn save_and_get_fact() {
        let store = SqliteStore::open_in_memory().unwrap();
        let f = fact("f1");
        store.save_fact_impl(&f).unwrap();
        let got = store.get_fact_impl("f1").unwrap();
        assert_eq!(got.id, "f1");
        assert_eq!(got.d.get("amount"), Some(&json!(10)));
    }

    #[test]
    fn get_missing_fact_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.get_fact_impl("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn resaving_preserves_creation_time() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut f = fact("f1");
        store.save_fact_impl(&f).unwrap();
        let original_c = store.get_fact_impl("f1").unwrap().c;

        f.c = Utc::now() + chrono::Duration::days(1); // attempted change, should be ignored
        f.d.insert("amount".into(), json!(99));
        store.save_fact_impl(&f).unwrap();

        let got = store.get_fact_impl("f1").unwrap();
        assert_eq!(got.c, original_c);
        assert_eq!(got.d.get("amount"), Some(&json!(99)));
    }

    /// S4: the first save of a fact reports `Inserted`, an identical
    /// re-save reports `Ignored`, and a re-save that actually changes `d`
    /// reports `Updated`.
    #[test]
    fn save_outcome_distinguishes_inserted_updated_and_ignored() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut f = fact("f1");

        let first = store.save_fact_impl(&f).unwrap();
        assert_eq!(first, SaveOutcome::Inserted);

        let identical = store.save_fact_impl(&f).unwrap();
        assert_eq!(identical, SaveOutcome::Ignored);

        f.d.insert("amount".into(), json!(20));
        let changed = store.save_fact_impl(&f).unwrap();
        assert_eq!(changed, SaveOutcome::Updated);
    }
}
