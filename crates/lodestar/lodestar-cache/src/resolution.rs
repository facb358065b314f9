use crate::now_secs;
use crate::policy::DatasetPolicy;
use crate::source::{RecordSource, RemoteRecords};
use lodestar_api::RemoteDataClient;
use lodestar_store::{CacheEntry, Dataset, Store};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Result of a synchronous lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub id: u32,
    pub name: String,
    pub attrs: Map<String, Value>,
    /// False when `name` is the placeholder for a not yet resolved id.
    pub from_cache: bool,
}

struct Refresher {
    source: Arc<dyn RecordSource>,
    runtime: Handle,
}

/// Store-backed id to name resolution for one dataset.
///
/// `get` never blocks on the network. Misses and stale rows are handed to a
/// background task on `runtime`; at most one task per id is in flight, and a
/// failed fetch leaves the store untouched so the next read tries again.
pub struct ResolutionCache {
    policy: DatasetPolicy,
    store: Store,
    refresher: Option<Refresher>,
    in_flight: Arc<Mutex<HashSet<u32>>>,
}

impl ResolutionCache {
    /// Resolve from the store only.
    pub fn new(policy: DatasetPolicy, store: Store) -> Self {
        Self {
            policy,
            store,
            refresher: None,
            in_flight: Arc::default(),
        }
    }

    pub fn with_source(
        policy: DatasetPolicy,
        store: Store,
        source: Arc<dyn RecordSource>,
        runtime: Handle,
    ) -> Self {
        Self {
            refresher: Some(Refresher { source, runtime }),
            ..Self::new(policy, store)
        }
    }

    pub fn dataset(&self) -> Dataset {
        self.policy.dataset
    }

    pub fn is_fetching(&self, id: u32) -> bool {
        self.in_flight.lock().contains(&id)
    }

    pub fn get(&self, id: u32) -> Resolved {
        if let Some(name) = self.policy.sentinel_name(id) {
            return Resolved {
                id,
                name: name.to_owned(),
                attrs: Map::new(),
                from_cache: true,
            };
        }

        match self.store.entry(self.policy.dataset, id) {
            Ok(Some(entry)) => {
                if self.policy.is_stale(entry.fetched_at, now_secs()) {
                    self.schedule(id);
                }
                Resolved {
                    id,
                    name: entry.name,
                    attrs: entry.attrs,
                    from_cache: true,
                }
            }
            Ok(None) => {
                self.schedule(id);
                self.fallback(id)
            }
            Err(e) => {
                warn!(dataset = self.policy.dataset.table(), id, error = %e, "store read failed");
                self.fallback(id)
            }
        }
    }

    fn fallback(&self, id: u32) -> Resolved {
        Resolved {
            id,
            name: self.policy.fallback_name(id),
            attrs: Map::new(),
            from_cache: false,
        }
    }

    fn schedule(&self, id: u32) {
        let Some(refresher) = &self.refresher else {
            return;
        };
        if !self.policy.remote || !self.in_flight.lock().insert(id) {
            return;
        }

        let source = Arc::clone(&refresher.source);
        let store = self.store.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let dataset = self.policy.dataset;
        refresher.runtime.spawn(async move {
            match source.fetch(id).await {
                Some(record) => {
                    let entry = CacheEntry {
                        id,
                        name: record.name,
                        attrs: record.attrs,
                        fetched_at: now_secs(),
                    };
                    match store.upsert_entry(dataset, &entry) {
                        Ok(()) => debug!(table = dataset.table(), id, name = %entry.name, "resolved"),
                        Err(e) => warn!(table = dataset.table(), id, error = %e, "store write failed"),
                    }
                }
                None => debug!(table = dataset.table(), id, "no record, retrying on next read"),
            }
            in_flight.lock().remove(&id);
        });
    }
}

/// One resolution cache per dataset, as the orchestrator consumes them.
pub struct ResolverSet {
    pub profession: ResolutionCache,
    pub specialization: ResolutionCache,
    pub map: ResolutionCache,
    pub map_type: ResolutionCache,
    pub mount: ResolutionCache,
    pub wvw_team: ResolutionCache,
}

impl ResolverSet {
    /// Reference datasets fetch through `client`; the rest resolve from
    /// seeded rows only.
    pub fn new(store: &Store, client: Arc<RemoteDataClient>, runtime: Handle) -> Self {
        let remote = |dataset| {
            ResolutionCache::with_source(
                DatasetPolicy::for_dataset(dataset),
                store.clone(),
                Arc::new(RemoteRecords::new(Arc::clone(&client), dataset)),
                runtime.clone(),
            )
        };
        let local = |dataset| ResolutionCache::new(DatasetPolicy::for_dataset(dataset), store.clone());
        Self {
            profession: remote(Dataset::Profession),
            specialization: remote(Dataset::Specialization),
            map: remote(Dataset::Map),
            map_type: local(Dataset::MapType),
            mount: local(Dataset::Mount),
            wvw_team: local(Dataset::WvwTeam),
        }
    }

    /// Store-only resolution for every dataset.
    pub fn offline(store: &Store) -> Self {
        let local = |dataset| ResolutionCache::new(DatasetPolicy::for_dataset(dataset), store.clone());
        Self {
            profession: local(Dataset::Profession),
            specialization: local(Dataset::Specialization),
            map: local(Dataset::Map),
            map_type: local(Dataset::MapType),
            mount: local(Dataset::Mount),
            wvw_team: local(Dataset::WvwTeam),
        }
    }
}
