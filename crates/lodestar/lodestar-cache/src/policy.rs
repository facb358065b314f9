use lodestar_store::{Dataset, SeedPolicy};
use std::time::Duration;

const DAY: u64 = 24 * 60 * 60;

/// Per-dataset knobs for the shared resolution algorithm.
#[derive(Debug, Clone, Copy)]
pub struct DatasetPolicy {
    pub dataset: Dataset,
    /// Rows older than this are served but refreshed in the background.
    pub max_age: Duration,
    /// Id that short-circuits to a fixed name without touching the store.
    pub sentinel: Option<(u32, &'static str)>,
    /// Whether misses are fetched remotely at all.
    pub remote: bool,
    pub seed_policy: SeedPolicy,
}

impl DatasetPolicy {
    pub fn for_dataset(dataset: Dataset) -> Self {
        let days = |n: u64| Duration::from_secs(n * DAY);
        match dataset {
            Dataset::Profession => Self {
                dataset,
                max_age: days(30),
                sentinel: Some((0, "None")),
                remote: true,
                seed_policy: SeedPolicy::InsertIfAbsent,
            },
            Dataset::Specialization => Self {
                dataset,
                max_age: days(30),
                sentinel: Some((0, "Core")),
                remote: true,
                seed_policy: SeedPolicy::InsertIfAbsent,
            },
            Dataset::Map => Self {
                dataset,
                max_age: days(14),
                sentinel: Some((0, "None")),
                remote: true,
                seed_policy: SeedPolicy::InsertIfAbsent,
            },
            Dataset::MapType => Self {
                dataset,
                max_age: days(365),
                sentinel: None,
                remote: false,
                seed_policy: SeedPolicy::InsertIfAbsent,
            },
            Dataset::Mount => Self {
                dataset,
                max_age: days(365),
                sentinel: Some((0, "None")),
                remote: false,
                seed_policy: SeedPolicy::Overwrite,
            },
            Dataset::WvwTeam => Self {
                dataset,
                max_age: days(365),
                sentinel: Some((0, "None")),
                remote: false,
                seed_policy: SeedPolicy::Overwrite,
            },
        }
    }

    pub fn sentinel_name(&self, id: u32) -> Option<&'static str> {
        self.sentinel
            .and_then(|(sentinel, name)| (sentinel == id).then_some(name))
    }

    /// Deterministic placeholder for ids not yet resolved.
    pub fn fallback_name(&self, id: u32) -> String {
        format!("{} {}", self.dataset.label(), id)
    }

    pub fn is_stale(&self, fetched_at: i64, now: i64) -> bool {
        now.saturating_sub(fetched_at) > self.max_age.as_secs() as i64
    }
}
