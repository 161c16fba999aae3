//! Cache Entry Module
//!
//! A cached value and the instant it was read from the backend.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Last-known value for a key, stamped with its insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The value as read from the backend
    pub value: String,
    /// When the value was inserted (monotonic)
    pub inserted_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry inserted at `now`.
    pub fn new(value: String, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now` for the given TTL.
    ///
    /// Boundary condition: an entry is expired once `now - inserted_at >= ttl`,
    /// so a read exactly at the TTL boundary misses.
    pub fn is_expired_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }

    /// Checks whether the entry is stale right now.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.is_expired_at(Instant::now(), ttl)
    }

    // == Time To Live ==
    /// Returns how long the entry stays fresh after `now`, zero once expired.
    pub fn remaining_at(&self, now: Instant, ttl: Duration) -> Duration {
        ttl.saturating_sub(now.saturating_duration_since(self.inserted_at))
    }
}
