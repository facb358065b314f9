//! Caches over the shared store: per-dataset name resolution, the bulk item
//! search index and trading post prices.

mod policy;
mod prices;
mod resolution;
mod search;
mod seeds;
mod source;

pub use policy::DatasetPolicy;
pub use prices::PriceCache;
pub use resolution::{ResolutionCache, Resolved, ResolverSet};
pub use search::{BuildOutcome, BulkSearchIndex, IndexOptions, IndexStatus};
pub use seeds::seed_static;
pub use source::{ItemCatalog, PriceSource, RecordSource, RemoteRecords};

pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
