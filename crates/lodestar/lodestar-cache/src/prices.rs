use crate::now_secs;
use crate::source::PriceSource;
use lodestar_api::PriceRecord;
use lodestar_store::{PriceEntry, Store};
use std::sync::Arc;
use tracing::{debug, warn};

/// Trading post prices. Reads come straight from the store; refreshing is
/// always explicit.
pub struct PriceCache {
    store: Store,
    source: Arc<dyn PriceSource>,
}

fn to_entry(record: PriceRecord, fetched_at: i64) -> PriceEntry {
    PriceEntry {
        id: record.id,
        buy_price: record.buy_price,
        sell_price: record.sell_price,
        buy_quantity: record.buy_quantity,
        sell_quantity: record.sell_quantity,
        fetched_at,
    }
}

impl PriceCache {
    pub fn new(store: Store, source: Arc<dyn PriceSource>) -> Self {
        Self { store, source }
    }

    /// Last stored quote, however old.
    pub fn get(&self, id: u32) -> Option<PriceEntry> {
        self.store.price(id).unwrap_or_else(|e| {
            warn!(id, error = %e, "price read failed");
            None
        })
    }

    /// Fetch now and store. `None` when the fetch or the write fails; any
    /// earlier quote stays in place.
    pub async fn refresh(&self, id: u32) -> Option<PriceEntry> {
        let record = self.source.price(id).await?;
        let entry = to_entry(record, now_secs());
        self.save(&entry).then_some(entry)
    }

    /// Batched refresh. Returns the quotes that were fetched and stored.
    pub async fn refresh_many(&self, ids: &[u32]) -> Vec<PriceEntry> {
        let fetched_at = now_secs();
        let stored: Vec<PriceEntry> = self
            .source
            .prices(ids)
            .await
            .into_iter()
            .map(|record| to_entry(record, fetched_at))
            .filter(|entry| self.save(entry))
            .collect();
        debug!(requested = ids.len(), stored = stored.len(), "prices refreshed");
        stored
    }

    fn save(&self, entry: &PriceEntry) -> bool {
        match self.store.upsert_price(entry) {
            Ok(()) => true,
            Err(e) => {
                warn!(id = entry.id, error = %e, "price write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakePrices(HashMap<u32, PriceRecord>);

    fn quote(id: u32, buy: i64, sell: i64) -> PriceRecord {
        PriceRecord {
            id,
            buy_price: buy,
            buy_quantity: 10,
            sell_price: sell,
            sell_quantity: 5,
        }
    }

    #[async_trait]
    impl PriceSource for FakePrices {
        async fn price(&self, id: u32) -> Option<PriceRecord> {
            self.0.get(&id).cloned()
        }

        async fn prices(&self, ids: &[u32]) -> Vec<PriceRecord> {
            ids.iter().filter_map(|id| self.0.get(id).cloned()).collect()
        }
    }

    fn cache(store: &Store) -> PriceCache {
        let quotes = [quote(19721, 120, 150), quote(24, 3, 7)]
            .into_iter()
            .map(|q| (q.id, q))
            .collect();
        PriceCache::new(store.clone(), Arc::new(FakePrices(quotes)))
    }

    #[tokio::test]
    async fn get_never_fetches() {
        let store = Store::open_in_memory().unwrap();
        let prices = cache(&store);
        assert_eq!(prices.get(19721), None);

        let fresh = prices.refresh(19721).await.unwrap();
        assert_eq!(fresh.sell_price, 150);
        assert_eq!(prices.get(19721), Some(fresh));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_old_quote() {
        let store = Store::open_in_memory().unwrap();
        let old = PriceEntry {
            id: 77,
            buy_price: 1,
            sell_price: 2,
            buy_quantity: 3,
            sell_quantity: 4,
            fetched_at: 0,
        };
        store.upsert_price(&old).unwrap();
        let prices = cache(&store);

        assert_eq!(prices.refresh(77).await, None);
        assert_eq!(prices.get(77), Some(old));
    }

    #[tokio::test]
    async fn refresh_many_skips_missing() {
        let store = Store::open_in_memory().unwrap();
        let prices = cache(&store);

        let stored = prices.refresh_many(&[24, 19721, 5]).await;
        assert_eq!(stored.len(), 2);
        assert!(prices.get(24).is_some());
        assert!(prices.get(5).is_none());
    }
}
