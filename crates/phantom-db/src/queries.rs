use crate::Database;
use crate::models::CacheRow;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Key/value cache --

    pub fn get_entry(&self, key: &str) -> Result<Option<CacheRow>> {
        self.with_conn(|conn| query_entry(conn, key))
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_entry(key)?.map(|row| row.value))
    }

    /// Insert or overwrite a value, bumping `updated_at`.
    pub fn put_value(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO kv_cache (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value),
            )?;
            Ok(())
        })
    }

    /// Returns true if a row was removed.
    pub fn delete_value(&self, key: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM kv_cache WHERE key = ?1", [key])?;
            Ok(n > 0)
        })
    }
}

fn query_entry(conn: &Connection, key: &str) -> Result<Option<CacheRow>> {
    let mut stmt = conn.prepare("SELECT key, value, updated_at FROM kv_cache WHERE key = ?1")?;

    let row = stmt
        .query_row([key], |row| {
            Ok(CacheRow {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
