//! SQLite store shared by every cache.
//!
//! One connection behind a mutex. Calls are short row-level statements, so
//! holding the lock never spans network I/O.

mod dataset;
mod entries;
mod error;
mod items;
mod meta;
mod prices;
mod schema;

pub use dataset::Dataset;
pub use entries::{CacheEntry, SeedPolicy};
pub use error::{StoreError, StoreResult};
pub use items::ItemRow;
pub use prices::PriceEntry;

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!(path = %path.as_ref().display(), "store opened");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> StoreResult<Self> {
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}
