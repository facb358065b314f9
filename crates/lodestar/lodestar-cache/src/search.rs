use crate::now_secs;
use crate::source::ItemCatalog;
use lodestar_store::{ItemRow, Store, StoreResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const OFFSET_KEY: &str = "index.offset";
const COMPLETED_AT_KEY: &str = "index.completed_at";
/// Consecutive builds whose batch at the stored offset came back empty.
const FAILURES_KEY: &str = "index.failures";
/// A batch that fails this many builds in a row is skipped.
const MAX_BATCH_FAILURES: i64 = 3;
const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    pub batch_size: usize,
    /// A completed build younger than this is not redone.
    pub max_age: Duration,
    pub search_limit: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            batch_size: lodestar_api::BATCH_LIMIT,
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
            search_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Another build holds the guard.
    AlreadyRunning,
    /// Last completed build is within `max_age`.
    UpToDate,
    Completed { items: usize },
    /// Stopped partway; the next build resumes from `offset`.
    Interrupted { offset: usize },
    /// The id listing could not be fetched.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStatus {
    pub rows: usize,
    pub offset: usize,
    pub completed_at: Option<i64>,
    pub building: bool,
}

struct BuildGuard<'a>(&'a AtomicBool);

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Local search over every tradeable item, filled in resumable batches.
///
/// Progress lives in the store's meta table and is written in the same
/// transaction as each batch, so a build killed at any point restarts at the
/// first batch it did not commit.
pub struct BulkSearchIndex {
    store: Store,
    catalog: Arc<dyn ItemCatalog>,
    options: IndexOptions,
    building: AtomicBool,
}

impl BulkSearchIndex {
    pub fn new(store: Store, catalog: Arc<dyn ItemCatalog>, options: IndexOptions) -> Self {
        Self {
            store,
            catalog,
            options: IndexOptions {
                batch_size: options.batch_size.clamp(1, lodestar_api::BATCH_LIMIT),
                ..options
            },
            building: AtomicBool::new(false),
        }
    }

    /// Substring search. Queries shorter than two characters return nothing.
    pub fn search(&self, query: &str) -> Vec<ItemRow> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }
        match self.store.search_items(query, self.options.search_limit) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "item search failed");
                Vec::new()
            }
        }
    }

    /// True once any build has completed.
    pub fn is_ready(&self) -> bool {
        matches!(self.store.meta_i64(COMPLETED_AT_KEY), Ok(Some(_)))
    }

    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::Acquire)
    }

    pub fn status(&self) -> StoreResult<IndexStatus> {
        Ok(IndexStatus {
            rows: self.store.item_count()?,
            offset: self.stored_offset()?,
            completed_at: self.store.meta_i64(COMPLETED_AT_KEY)?,
            building: self.is_building(),
        })
    }

    fn stored_offset(&self) -> StoreResult<usize> {
        Ok(self
            .store
            .meta_i64(OFFSET_KEY)?
            .map_or(0, |v| usize::try_from(v).unwrap_or(0)))
    }

    /// Fill the index, resuming an interrupted run. Concurrent calls return
    /// `AlreadyRunning` without doing anything.
    pub async fn build(&self) -> BuildOutcome {
        if self
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("index build already running");
            return BuildOutcome::AlreadyRunning;
        }
        let _guard = BuildGuard(&self.building);

        match self.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "index build stopped on store error");
                let offset = self.stored_offset().unwrap_or(0);
                BuildOutcome::Interrupted { offset }
            }
        }
    }

    async fn run(&self) -> StoreResult<BuildOutcome> {
        let mut offset = self.stored_offset()?;
        let now = now_secs();
        if offset == 0 {
            if let Some(completed_at) = self.store.meta_i64(COMPLETED_AT_KEY)? {
                let age = now.saturating_sub(completed_at);
                if age < self.options.max_age.as_secs() as i64 {
                    debug!(age_secs = age, "index is fresh, skipping build");
                    return Ok(BuildOutcome::UpToDate);
                }
            }
        }

        let Some(mut ids) = self.catalog.tradeable_ids().await else {
            warn!("tradeable id listing unavailable");
            return Ok(BuildOutcome::Unavailable);
        };
        ids.sort_unstable();
        ids.dedup();
        let total = ids.len();
        if offset > total {
            warn!(offset, total, "stored offset past end of listing");
            offset = total;
        }
        info!(total, offset, "index build starting");
        let mut failures = self.store.meta_i64(FAILURES_KEY)?.unwrap_or(0);

        while offset < total {
            let end = (offset + self.options.batch_size).min(total);
            let fetched = self.catalog.items(&ids[offset..end]).await;
            if fetched.is_empty() {
                failures += 1;
                if failures < MAX_BATCH_FAILURES {
                    self.store.set_meta(FAILURES_KEY, &failures.to_string())?;
                    warn!(offset, failures, "batch fetch returned nothing, stopping");
                    return Ok(BuildOutcome::Interrupted { offset });
                }
                warn!(offset, end, failures, "batch keeps failing, skipping it");
                // Counter first: a crash in between only costs extra retries.
                self.store.set_meta(FAILURES_KEY, "0")?;
                self.store.set_meta(OFFSET_KEY, &end.to_string())?;
                failures = 0;
                offset = end;
                continue;
            }

            let rows: Vec<ItemRow> = fetched
                .into_iter()
                .map(|item| ItemRow {
                    id: item.id,
                    name: item.name,
                    rarity: item.rarity,
                    kind: item.kind,
                    icon: item.icon,
                })
                .collect();
            let next_offset = end.to_string();
            self.store
                .upsert_items(&rows, now_secs(), Some((OFFSET_KEY, next_offset.as_str())))?;
            debug!(offset = end, total, batch = rows.len(), "index batch committed");
            if failures > 0 {
                self.store.set_meta(FAILURES_KEY, "0")?;
                failures = 0;
            }
            offset = end;
        }

        self.store
            .set_meta(COMPLETED_AT_KEY, &now_secs().to_string())?;
        self.store.set_meta(OFFSET_KEY, "0")?;
        info!(total, "index build complete");
        Ok(BuildOutcome::Completed { items: total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lodestar_api::ItemRecord;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    const DAY: i64 = 24 * 60 * 60;

    /// Serves ids in descending order to check the build sorts them.
    struct FakeCatalog {
        ids: Vec<u32>,
        requested: Mutex<Vec<u32>>,
        listings: Mutex<usize>,
        fail_from: Option<u32>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeCatalog {
        fn new(count: u32) -> Self {
            Self {
                ids: (0..count).rev().map(|i| 1000 + i).collect(),
                requested: Mutex::new(Vec::new()),
                listings: Mutex::new(0),
                fail_from: None,
                gate: None,
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().clone()
        }
    }

    #[async_trait]
    impl ItemCatalog for FakeCatalog {
        async fn tradeable_ids(&self) -> Option<Vec<u32>> {
            *self.listings.lock() += 1;
            Some(self.ids.clone())
        }

        async fn items(&self, ids: &[u32]) -> Vec<ItemRecord> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_from.is_some_and(|f| ids[0] >= f) {
                return Vec::new();
            }
            self.requested.lock().extend_from_slice(ids);
            ids.iter()
                .map(|&id| ItemRecord {
                    id,
                    name: format!("Item {id}"),
                    rarity: "Fine".into(),
                    kind: None,
                    icon: None,
                })
                .collect()
        }
    }

    fn index(store: &Store, catalog: Arc<FakeCatalog>) -> BulkSearchIndex {
        BulkSearchIndex::new(store.clone(), catalog, IndexOptions::default())
    }

    #[tokio::test]
    async fn full_build_indexes_everything() {
        let store = Store::open_in_memory().unwrap();
        let catalog = Arc::new(FakeCatalog::new(450));
        let idx = index(&store, Arc::clone(&catalog));
        assert!(!idx.is_ready());

        assert_eq!(idx.build().await, BuildOutcome::Completed { items: 450 });
        assert!(idx.is_ready());
        assert!(!idx.is_building());

        let requested = catalog.requested();
        let mut sorted = requested.clone();
        sorted.sort_unstable();
        assert_eq!(requested, sorted);

        let status = idx.status().unwrap();
        assert_eq!(status.rows, 450);
        assert_eq!(status.offset, 0);
        assert!(status.completed_at.is_some());
    }

    #[tokio::test]
    async fn resumes_from_stored_offset() {
        let store = Store::open_in_memory().unwrap();
        store.set_meta(OFFSET_KEY, "400").unwrap();
        let catalog = Arc::new(FakeCatalog::new(1000));
        let idx = index(&store, Arc::clone(&catalog));

        assert_eq!(idx.build().await, BuildOutcome::Completed { items: 1000 });

        // Sorted ids are 1000..2000; the first 400 were already committed.
        let requested = catalog.requested();
        assert_eq!(requested.len(), 600);
        assert_eq!(requested.first(), Some(&1400));
        assert!(requested.iter().all(|&id| id >= 1400));
        assert_eq!(store.item_count().unwrap(), 600);
    }

    #[tokio::test]
    async fn failed_batch_keeps_progress() {
        let store = Store::open_in_memory().unwrap();
        let mut failing = FakeCatalog::new(1000);
        failing.fail_from = Some(1600);
        let idx = index(&store, Arc::new(failing));

        assert_eq!(idx.build().await, BuildOutcome::Interrupted { offset: 600 });
        assert!(!idx.is_ready());
        assert_eq!(idx.status().unwrap().offset, 600);
        assert_eq!(store.item_count().unwrap(), 600);

        let healthy = Arc::new(FakeCatalog::new(1000));
        let idx = index(&store, Arc::clone(&healthy));
        assert_eq!(idx.build().await, BuildOutcome::Completed { items: 1000 });
        assert_eq!(healthy.requested().first(), Some(&1600));
        assert_eq!(store.item_count().unwrap(), 1000);
        assert_eq!(store.meta_i64(FAILURES_KEY).unwrap(), Some(0));
    }

    #[tokio::test]
    async fn permanently_empty_batch_is_skipped() {
        let store = Store::open_in_memory().unwrap();
        let mut failing = FakeCatalog::new(1000);
        failing.fail_from = Some(1600);
        let idx = index(&store, Arc::new(failing));

        // Windows at 600 and 800 never return anything.
        assert_eq!(idx.build().await, BuildOutcome::Interrupted { offset: 600 });
        assert_eq!(idx.build().await, BuildOutcome::Interrupted { offset: 600 });
        assert_eq!(idx.build().await, BuildOutcome::Interrupted { offset: 800 });
        assert_eq!(idx.status().unwrap().offset, 800);
        assert_eq!(idx.build().await, BuildOutcome::Interrupted { offset: 800 });
        assert!(!idx.is_ready());

        assert_eq!(idx.build().await, BuildOutcome::Completed { items: 1000 });
        assert!(idx.is_ready());
        assert_eq!(store.item_count().unwrap(), 600);
        assert_eq!(idx.status().unwrap().offset, 0);
    }

    #[tokio::test]
    async fn recent_build_is_skipped() {
        let store = Store::open_in_memory().unwrap();
        store
            .set_meta(COMPLETED_AT_KEY, &(now_secs() - DAY).to_string())
            .unwrap();
        let catalog = Arc::new(FakeCatalog::new(10));
        let idx = index(&store, Arc::clone(&catalog));

        assert_eq!(idx.build().await, BuildOutcome::UpToDate);
        assert_eq!(*catalog.listings.lock(), 0);
    }

    #[tokio::test]
    async fn old_build_is_redone() {
        let store = Store::open_in_memory().unwrap();
        store
            .set_meta(COMPLETED_AT_KEY, &(now_secs() - 8 * DAY).to_string())
            .unwrap();
        let catalog = Arc::new(FakeCatalog::new(10));
        let idx = index(&store, Arc::clone(&catalog));

        assert_eq!(idx.build().await, BuildOutcome::Completed { items: 10 });
    }

    #[tokio::test]
    async fn concurrent_build_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let gate = Arc::new(Notify::new());
        let mut gated = FakeCatalog::new(10);
        gated.gate = Some(Arc::clone(&gate));
        let idx = Arc::new(index(&store, Arc::new(gated)));

        let first = tokio::spawn({
            let idx = Arc::clone(&idx);
            async move { idx.build().await }
        });
        while !idx.is_building() {
            tokio::task::yield_now().await;
        }

        assert_eq!(idx.build().await, BuildOutcome::AlreadyRunning);
        gate.notify_one();
        assert_eq!(
            first.await.unwrap(),
            BuildOutcome::Completed { items: 10 }
        );
        assert!(!idx.is_building());
    }

    #[tokio::test]
    async fn short_queries_return_nothing() {
        let store = Store::open_in_memory().unwrap();
        let idx = index(&store, Arc::new(FakeCatalog::new(30)));
        idx.build().await;

        assert!(idx.search("I").is_empty());
        assert!(idx.search("  ").is_empty());
        let hits = idx.search("Item 10");
        assert!(!hits.is_empty());
        assert!(hits.len() <= 20);
        assert!(hits.iter().all(|row| row.name.contains("Item 10")));
    }
}
