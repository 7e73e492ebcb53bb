// State Module - Snapshot value type and last-seen snapshot cache

pub mod snapshot;
pub mod cache;

pub use snapshot::MarketSnapshot;
pub use cache::{StateCache, DEFAULT_MAX_AGE_SECS};
