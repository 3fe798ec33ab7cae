use super::Cache;
use crate::error::CacheError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// In-memory backend with expiry sweep, grounded in
/// `original_source/app/cache/memory.py`'s `MemoryCacheBackend`, and
/// `basic-cache-logic/src/in_memory_cache.rs`'s `HashMapCache` for the
/// interior-mutability shape. For development/testing; state does not
/// survive a process restart.
#[derive(Default)]
pub struct MemoryCache {
    store: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all expired entries. Not required by any single `get`/`set`
    /// call (those already lazy-delete on expiry) but keeps a long-running
    /// process's memory bounded between requests, per
    /// `original_source/app/cache/memory.py::cleanup_expired`.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.lock().await;
        let before = store.len();
        store.retain(|_, entry| entry.expires_at.is_none_or(|exp| exp > now));
        before - store.len()
    }
}

#[async_trait::async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut store = self.store.lock().await;
        match store.get(key) {
            Some(entry) if entry.expires_at.is_none_or(|exp| exp > Instant::now()) => {
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                store.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        self.store
            .lock()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn clear(&self, prefix: &str) -> Result<(), CacheError> {
        self.store
            .lock()
            .await
            .retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
