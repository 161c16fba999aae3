//! Cache Expiry Sweep
//!
//! Reads already treat stale entries as absent; this task reclaims the
//! memory and capacity of entries nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a task that removes expired cache entries every `interval`.
///
/// The returned handle is aborted during graceful shutdown.
pub fn spawn_cleanup_task(cache: Arc<RwLock<CacheStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting cache expiry sweep");

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let (removed, remaining) = {
                let mut cache = cache.write().await;
                (cache.cleanup_expired(), cache.len())
            };

            if removed > 0 {
                info!(removed, remaining, "Expired cache entries removed");
            } else {
                debug!(remaining, "No expired cache entries");
            }
        }
    })
}
