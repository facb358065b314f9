use crate::Store;
use crate::error::StoreResult;
use crate::schema::fold;
use rusqlite::params;

/// One search-index row.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub id: u32,
    pub name: String,
    pub rarity: String,
    pub kind: Option<String>,
    pub icon: Option<String>,
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Store {
    /// Upsert a batch and record build progress in the same transaction, so
    /// an interrupted build never sees rows without the offset or the
    /// reverse.
    pub fn upsert_items(
        &self,
        items: &[ItemRow],
        fetched_at: i64,
        progress: Option<(&str, &str)>,
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO items (id, name, name_folded, rarity, kind, icon, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    name_folded = excluded.name_folded,
                    rarity = excluded.rarity,
                    kind = excluded.kind,
                    icon = excluded.icon,
                    fetched_at = excluded.fetched_at",
            )?;
            for item in items {
                stmt.execute(params![
                    item.id,
                    item.name,
                    fold(&item.name),
                    item.rarity,
                    item.kind,
                    item.icon,
                    fetched_at
                ])?;
            }
        }
        if let Some((key, value)) = progress {
            tx.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Case-insensitive substring search, Unicode-aware. Prefix matches
    /// first, then shorter names.
    pub fn search_items(&self, query: &str, limit: usize) -> StoreResult<Vec<ItemRow>> {
        let escaped = escape_like(&fold(query));
        let contains = format!("%{escaped}%");
        let prefix = format!("{escaped}%");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, rarity, kind, icon FROM items
             WHERE name_folded LIKE ?1 ESCAPE '\\'
             ORDER BY CASE WHEN name_folded LIKE ?2 ESCAPE '\\' THEN 0 ELSE 1 END,
                      length(name), name, id
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![contains, prefix, limit as i64], |row| {
                Ok(ItemRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    rarity: row.get(2)?,
                    kind: row.get(3)?,
                    icon: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn item_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
