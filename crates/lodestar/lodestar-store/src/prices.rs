use crate::Store;
use crate::error::StoreResult;
use rusqlite::{OptionalExtension, params};

/// Trading post quote for one item, in copper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub id: u32,
    pub buy_price: i64,
    pub sell_price: i64,
    pub buy_quantity: i64,
    pub sell_quantity: i64,
    /// Unix seconds.
    pub fetched_at: i64,
}

impl Store {
    pub fn price(&self, id: u32) -> StoreResult<Option<PriceEntry>> {
        let conn = self.conn.lock();
        let entry = conn
            .query_row(
                "SELECT id, buy_price, sell_price, buy_quantity, sell_quantity, fetched_at
                 FROM prices WHERE id = ?1",
                params![id],
                |row| {
                    Ok(PriceEntry {
                        id: row.get(0)?,
                        buy_price: row.get(1)?,
                        sell_price: row.get(2)?,
                        buy_quantity: row.get(3)?,
                        sell_quantity: row.get(4)?,
                        fetched_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    pub fn upsert_price(&self, entry: &PriceEntry) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO prices (id, buy_price, sell_price, buy_quantity, sell_quantity, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                buy_price = excluded.buy_price,
                sell_price = excluded.sell_price,
                buy_quantity = excluded.buy_quantity,
                sell_quantity = excluded.sell_quantity,
                fetched_at = excluded.fetched_at",
            params![
                entry.id,
                entry.buy_price,
                entry.sell_price,
                entry.buy_quantity,
                entry.sell_quantity,
                entry.fetched_at
            ],
        )?;
        Ok(())
    }
}
