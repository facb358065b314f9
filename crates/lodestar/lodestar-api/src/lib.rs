//! Read-only client for the reference data API.
//!
//! Every public fetch returns `Option`/`Vec` and logs its own failures; no
//! error escapes this crate past construction.

mod client;
mod error;
mod records;
mod throttle;

pub use client::{BATCH_LIMIT, ClientOptions, RemoteDataClient};
pub use error::{ApiError, ApiResult};
pub use records::{EntityRecord, ItemRecord, PriceRecord};
pub use throttle::Throttle;
