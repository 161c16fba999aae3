//! Cache Module
//!
//! Local read-through cache with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Default maximum number of cached keys
pub const DEFAULT_MAX_ITEMS: usize = 500;

/// Default time an entry stays fresh, in milliseconds
pub const DEFAULT_TTL_MS: u64 = 60_000;
