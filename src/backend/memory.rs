//! In-memory backend
//!
//! A [`KvBackend`] kept in process memory. It counts every call and can be
//! switched into a failing state, which makes it the test double for the
//! cache-consistency rules.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{BackendError, BackendResult, KvBackend};

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: Mutex<BTreeMap<String, String>>,
    unavailable: AtomicBool,
    gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    lists: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let backend = Self::new();
        backend.data().extend(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        backend
    }

    /// Makes every subsequent call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Writes directly, bypassing call counting. Simulates another writer.
    pub fn insert_external(&self, key: &str, value: &str) {
        self.data().insert(key.to_string(), value.to_string());
    }

    /// Reads directly, bypassing call counting.
    pub fn value(&self, key: &str) -> Option<String> {
        self.data().get(key).cloned()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.get_calls() + self.put_calls() + self.delete_calls() + self.list_calls()
    }

    fn data(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, counter: &AtomicUsize) -> BackendResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Connection(
                "in-memory backend marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for InMemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.record(&self.gets)?;
        Ok(self.data().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> BackendResult<()> {
        self.record(&self.puts)?;
        self.data().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        self.record(&self.deletes)?;
        self.data().remove(key);
        Ok(())
    }

    async fn list(&self) -> BackendResult<BTreeMap<String, String>> {
        self.record(&self.lists)?;
        Ok(self.data().clone())
    }
}
