use super::Cache;
use crate::error::CacheError;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;

/// Persistent backend over a single `(key, value, expires_at)` table.
///
/// spec.md §4.1 allows "persistent SQL table with `expires_at`" as one of the
/// pluggable backends. A single untyped k/v table has no relations to model,
/// so this goes straight through `sqlx` the way `da-indexer-logic`'s
/// repositories issue raw queries alongside their `sea-orm` entities.
pub struct SqlCache {
    pool: SqlitePool,
}

impl SqlCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kyt_cache (\
                key TEXT PRIMARY KEY, \
                value BLOB NOT NULL, \
                expires_at INTEGER \
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self { pool })
    }

    fn now_secs() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[async_trait::async_trait]
impl Cache for SqlCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let row: Option<(Vec<u8>, Option<i64>)> =
            sqlx::query_as("SELECT value, expires_at FROM kyt_cache WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        match row {
            Some((_value, Some(expires_at))) if expires_at <= Self::now_secs() => {
                self.delete(key).await?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Self::now_secs() + ttl.as_secs() as i64)
        };
        sqlx::query(
            "INSERT INTO kyt_cache (key, value, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM kyt_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn clear(&self, prefix: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM kyt_cache WHERE key LIKE ?")
            .bind(format!("{prefix}%"))
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_sqlite() {
        let cache = SqlCache::connect("sqlite::memory:").await.unwrap();
        cache
            .set("svc:tx:bitcoin:a", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("svc:tx:bitcoin:a").await.unwrap(),
            Some(b"v".to_vec())
        );
    }

    #[tokio::test]
    async fn expired_rows_are_treated_as_absent() {
        let cache = SqlCache::connect("sqlite::memory:").await.unwrap();
        cache
            .set("k", b"v".to_vec(), Duration::from_secs(0))
            .await
            .unwrap();
        // ttl = 0 is treated as "no expiry" per the memory backend's convention.
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
