//! Namespaced key/value cache with TTL (spec.md §4.1).
//!
//! Grounded in `libs/recache`'s `AsyncCacheStore` trait (get/set/delete shape)
//! and `original_source/app/core/cache.py`'s key-grammar helpers, generalized
//! to the three backends spec.md §6 enumerates (`memory`, `sql`, `remote`).

mod memory;
mod remote;
mod sql;

pub use memory::MemoryCache;
pub use remote::RemoteCache;
pub use sql::SqlCache;

use crate::error::CacheError;
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// The three key families spec.md §6 names. The Cache layer never interprets
/// the serialized value; these exist only to build namespaced keys.
pub enum KeyFamily {
    Tx,
    AddrMeta,
    RiskReport,
}

impl KeyFamily {
    fn segment(&self) -> &'static str {
        match self {
            KeyFamily::Tx => "tx",
            KeyFamily::AddrMeta => "address",
            KeyFamily::RiskReport => "risk",
        }
    }
}

/// Builds `svc:<family>:<chain>:<lower(id)>[:<depth>]` per spec.md §6.
pub fn make_key(family: KeyFamily, chain: &str, id: &str, depth: Option<u32>) -> String {
    let mut key = format!(
        "svc:{}:{}:{}",
        family.segment(),
        chain.to_lowercase(),
        id.to_lowercase()
    );
    if let Some(depth) = depth {
        key.push(':');
        key.push_str(&depth.to_string());
    }
    key
}

/// Capability set consumed by the Tracer and Report Builder (spec.md §4.1).
///
/// A backend failure on `get`/`set` is never fatal: callers treat the
/// returned `Err` as a miss and fall through to the Provider, per spec.md §7
/// `CacheError`.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
    async fn clear(&self, prefix: &str) -> Result<(), CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Read-through helper shared by the Tracer's cache-through paths
/// (spec.md §4.3.7): serialize `compute`'s fallback value through JSON,
/// write it back on a miss.
pub async fn get_or_compute<T, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T, CacheError>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, CacheError>>,
{
    if let Ok(Some(bytes)) = cache.get(key).await {
        if let Ok(value) = serde_json::from_slice::<T>(&bytes) {
            return Ok(value);
        }
    }
    let value = compute().await?;
    let bytes = serde_json::to_vec(&value)?;
    let _ = cache.set(key, bytes, ttl).await;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_grammar_matches_spec() {
        assert_eq!(
            make_key(KeyFamily::AddrMeta, "Ethereum", "0xABC", None),
            "svc:address:ethereum:0xabc"
        );
        assert_eq!(
            make_key(KeyFamily::Tx, "bitcoin", "DEADBEEF", None),
            "svc:tx:bitcoin:deadbeef"
        );
        assert_eq!(
            make_key(KeyFamily::RiskReport, "bitcoin", "DEADBEEF", Some(3)),
            "svc:risk:bitcoin:deadbeef:3"
        );
    }
}
