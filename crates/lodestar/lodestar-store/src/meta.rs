use crate::Store;
use crate::error::StoreResult;
use rusqlite::{OptionalExtension, params};

pub(crate) const SCHEMA_VERSION_KEY: &str = "schema_version";

impl Store {
    pub fn meta(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Integer view of a meta value. Unparseable values read as absent.
    pub fn meta_i64(&self, key: &str) -> StoreResult<Option<i64>> {
        Ok(self.meta(key)?.and_then(|v| v.parse().ok()))
    }
}
