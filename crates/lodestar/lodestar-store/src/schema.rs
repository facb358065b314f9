use crate::dataset::Dataset;
use crate::error::{StoreError, StoreResult};
use crate::meta::SCHEMA_VERSION_KEY;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::info;

pub(crate) const SCHEMA_VERSION: i64 = 2;

/// Lowercased copy of an item name. SQLite's `LIKE` only folds ASCII, so
/// search compares against this instead.
pub(crate) fn fold(text: &str) -> String {
    text.to_lowercase()
}

pub(crate) fn migrate(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);")?;

    let found: Option<i64> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![SCHEMA_VERSION_KEY],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .and_then(|v| v.parse().ok());

    match found {
        Some(v) if v == SCHEMA_VERSION => return Ok(()),
        Some(v) if v > SCHEMA_VERSION => {
            return Err(StoreError::SchemaTooNew {
                found: v,
                supported: SCHEMA_VERSION,
            });
        }
        _ => {}
    }

    let tx = conn.transaction()?;
    if found == Some(1) {
        add_folded_names(&tx)?;
    }
    for dataset in Dataset::ALL {
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                attrs TEXT NOT NULL DEFAULT '{{}}',
                fetched_at INTEGER NOT NULL
            );",
            dataset.table()
        ))?;
    }
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            name_folded TEXT NOT NULL DEFAULT '',
            rarity TEXT NOT NULL,
            kind TEXT,
            icon TEXT,
            fetched_at INTEGER NOT NULL
        );
        DROP INDEX IF EXISTS idx_items_name;
        CREATE INDEX IF NOT EXISTS idx_items_name_folded ON items(name_folded);
        CREATE TABLE IF NOT EXISTS prices (
            id INTEGER PRIMARY KEY,
            buy_price INTEGER NOT NULL,
            sell_price INTEGER NOT NULL,
            buy_quantity INTEGER NOT NULL,
            sell_quantity INTEGER NOT NULL,
            fetched_at INTEGER NOT NULL
        );",
    )?;
    tx.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![SCHEMA_VERSION_KEY, SCHEMA_VERSION.to_string()],
    )?;
    tx.commit()?;

    info!(version = SCHEMA_VERSION, "store schema ready");
    Ok(())
}

/// Version 1 had no folded name column. Add it and fill it from `name`.
fn add_folded_names(tx: &Transaction<'_>) -> StoreResult<()> {
    tx.execute_batch("ALTER TABLE items ADD COLUMN name_folded TEXT NOT NULL DEFAULT '';")?;
    let names = {
        let mut stmt = tx.prepare("SELECT id, name FROM items")?;
        stmt.query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?
    };
    {
        let mut update = tx.prepare("UPDATE items SET name_folded = ?1 WHERE id = ?2")?;
        for (id, name) in &names {
            update.execute(params![fold(name), id])?;
        }
    }
    info!(rows = names.len(), "item names folded");
    Ok(())
}
