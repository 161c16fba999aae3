//! Backend Module
//!
//! The authoritative key-value store behind the gateway. Handlers only see
//! the [`KvBackend`] trait; [`EtcdClient`] is the production implementation
//! and [`InMemoryBackend`] stands in for it in tests.

mod error;
mod etcd;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use error::{BackendError, BackendResult};
pub use etcd::{EtcdClient, EtcdOptions};
pub use memory::InMemoryBackend;

/// Key read by the health probe.
pub const HEALTH_PROBE_KEY: &str = "health_check";

/// Single-key and full-keyspace operations against the store.
///
/// Implementations own their connection and retry handling; the gateway
/// never retries on top of them.
#[async_trait]
pub trait KvBackend: Send + Sync + 'static {
    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Reads one key. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// Unconditionally writes one key.
    async fn put(&self, key: &str, value: &str) -> BackendResult<()>;

    /// Deletes one key. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> BackendResult<()>;

    /// Returns every key and its value.
    async fn list(&self) -> BackendResult<BTreeMap<String, String>>;

    /// Checks that the store answers at all.
    async fn ping(&self) -> BackendResult<()> {
        self.get(HEALTH_PROBE_KEY).await.map(|_| ())
    }
}
