use crate::Store;
use crate::dataset::Dataset;
use crate::error::StoreResult;
use rusqlite::{OptionalExtension, params};
use serde_json::{Map, Value};
use tracing::debug;

/// One resolved row. Presence says nothing about freshness; readers judge
/// `fetched_at` against their own max age.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: u32,
    pub name: String,
    pub attrs: Map<String, Value>,
    /// Unix seconds.
    pub fetched_at: i64,
}

/// How seed rows treat rows that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Keep existing rows, including ones refreshed from the remote API.
    InsertIfAbsent,
    /// Replace existing rows with the seed.
    Overwrite,
}

impl Store {
    pub fn entry(&self, dataset: Dataset, id: u32) -> StoreResult<Option<CacheEntry>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT id, name, attrs, fetched_at FROM {} WHERE id = ?1",
                    dataset.table()
                ),
                params![id],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, name, attrs, fetched_at)) = row else {
            return Ok(None);
        };
        Ok(Some(CacheEntry {
            id,
            name,
            attrs: serde_json::from_str(&attrs)?,
            fetched_at,
        }))
    }

    pub fn upsert_entry(&self, dataset: Dataset, entry: &CacheEntry) -> StoreResult<()> {
        let attrs = serde_json::to_string(&entry.attrs)?;
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, name, attrs, fetched_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    attrs = excluded.attrs,
                    fetched_at = excluded.fetched_at",
                dataset.table()
            ),
            params![entry.id, entry.name, attrs, entry.fetched_at],
        )?;
        Ok(())
    }

    /// Insert static rows in one transaction. Returns rows written.
    pub fn seed(
        &self,
        dataset: Dataset,
        rows: &[(u32, &str)],
        policy: SeedPolicy,
        fetched_at: i64,
    ) -> StoreResult<usize> {
        let verb = match policy {
            SeedPolicy::InsertIfAbsent => "INSERT OR IGNORE",
            SeedPolicy::Overwrite => "INSERT OR REPLACE",
        };
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "{verb} INTO {} (id, name, attrs, fetched_at) VALUES (?1, ?2, '{{}}', ?3)",
                dataset.table()
            ))?;
            for (id, name) in rows {
                written += stmt.execute(params![id, name, fetched_at])?;
            }
        }
        tx.commit()?;
        debug!(table = dataset.table(), written, ?policy, "seeded");
        Ok(written)
    }

    pub fn entry_count(&self, dataset: Dataset) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", dataset.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}
