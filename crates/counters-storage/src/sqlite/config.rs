//! Small persisted key-value config store (not the JSON config files).

use rusqlite::{Connection, params};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

pub(crate) fn set_config_on_conn(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

pub(crate) fn get_config_on_conn(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row("SELECT value FROM config WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    })
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("config", key),
        other => StorageError::Query(other),
    })
}

impl SqliteStore {
    pub fn set_config_impl(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        set_config_on_conn(&conn, key, value)
    }

    pub fn get_config_impl(&self, key: &str) -> Result<String> {
        let conn = self.lock_conn()?;
        get_config_on_conn(&conn, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_config() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_config_impl("k", "v1").unwrap();
        assert_eq!(store.get_config_impl("k").unwrap(), "v1");
        store.set_config_impl("k", "v2").unwrap();
        assert_eq!(store.get_config_impl("k").unwrap(), "v2");
    }

    #[test]
    fn get_missing_config_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.get_config_impl("nope").unwrap_err();
        assert!(err.is_not_found());
    }
}
