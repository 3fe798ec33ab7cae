use super::Cache;
use crate::error::CacheError;
use redis::AsyncCommands;
use std::time::Duration;

/// Remote in-memory store backend, grounded in
/// `libs/recache/src/stores/redis.rs`'s `RedisStore`, narrowed to the byte-string
/// contract `Cache` requires (the cache layer never interprets the value, so
/// there is no generic `V` to serialize here — that happens one layer up).
pub struct RemoteCache {
    connection: redis::aio::ConnectionManager,
}

impl RemoteCache {
    pub async fn connect(connection_string: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(connection_string)
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let connection = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self { connection })
    }
}

#[async_trait::async_trait]
impl Cache for RemoteCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        if ttl.is_zero() {
            let _: () = conn
                .set(key, value)
                .await
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        } else {
            let _: () = conn
                .set_ex(key, value, ttl.as_secs())
                .await
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        conn.exists(key)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    async fn clear(&self, prefix: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn
            .keys(format!("{prefix}*"))
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        if !keys.is_empty() {
            let _: () = conn
                .del(keys)
                .await
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
