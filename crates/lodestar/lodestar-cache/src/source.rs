use async_trait::async_trait;
use lodestar_api::{EntityRecord, ItemRecord, PriceRecord, RemoteDataClient};
use lodestar_store::Dataset;
use std::sync::Arc;

/// Where a resolution cache repopulates misses and stale rows from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// `None` on any failure; the caller logs and retries on a later read.
    async fn fetch(&self, id: u32) -> Option<EntityRecord>;
}

/// Bulk item listing used to build the search index.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn tradeable_ids(&self) -> Option<Vec<u32>>;
    /// May return fewer items than asked for.
    async fn items(&self, ids: &[u32]) -> Vec<ItemRecord>;
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, id: u32) -> Option<PriceRecord>;
    async fn prices(&self, ids: &[u32]) -> Vec<PriceRecord>;
}

/// Remote lookups for one dataset.
pub struct RemoteRecords {
    client: Arc<RemoteDataClient>,
    dataset: Dataset,
}

impl RemoteRecords {
    pub fn new(client: Arc<RemoteDataClient>, dataset: Dataset) -> Self {
        Self { client, dataset }
    }
}

#[async_trait]
impl RecordSource for RemoteRecords {
    async fn fetch(&self, id: u32) -> Option<EntityRecord> {
        match self.dataset {
            Dataset::Profession => self.client.fetch_profession(id).await,
            Dataset::Specialization => self.client.fetch_specialization(id).await,
            Dataset::Map => self.client.fetch_map(id).await,
            // Seeded locally; the API has no endpoint for these.
            Dataset::MapType | Dataset::Mount | Dataset::WvwTeam => None,
        }
    }
}

#[async_trait]
impl ItemCatalog for RemoteDataClient {
    async fn tradeable_ids(&self) -> Option<Vec<u32>> {
        self.fetch_tradeable_ids().await
    }

    async fn items(&self, ids: &[u32]) -> Vec<ItemRecord> {
        self.fetch_items(ids).await
    }
}

#[async_trait]
impl PriceSource for RemoteDataClient {
    async fn price(&self, id: u32) -> Option<PriceRecord> {
        self.fetch_price(id).await
    }

    async fn prices(&self, ids: &[u32]) -> Vec<PriceRecord> {
        self.fetch_prices(ids).await
    }
}
