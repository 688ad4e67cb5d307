//! Redis cache backend with pooled connections.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;

use super::store::{CacheError, CacheStore};

#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
    key_prefix: String,
}

impl RedisCacheStore {
    pub fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, CacheError> {
        let pool = PoolConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| CacheError::backend(format!("failed to create redis pool: {err}")))?;

        Ok(Self {
            pool,
            key_prefix: key_prefix.into(),
        })
    }

    pub async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;
        Ok(())
    }

    fn build_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheError::backend(format!("failed to get redis connection: {err}")))
    }
}

/// `SET EX` takes whole seconds; anything shorter than one second still expires.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get(self.build_key(key))
            .await
            .map_err(CacheError::backend)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(self.build_key(key), value, ttl_seconds(ttl))
            .await
            .map_err(CacheError::backend)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(self.build_key(key))
            .await
            .map_err(CacheError::backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(prefix: &str) -> RedisCacheStore {
        RedisCacheStore::connect("redis://127.0.0.1:6379", prefix).expect("pool config")
    }

    #[test]
    fn keys_carry_the_configured_prefix() {
        assert_eq!(store("webook").build_key("article:7"), "webook:article:7");
        assert_eq!(store("").build_key("article:7"), "article:7");
    }

    #[test]
    fn ttl_is_whole_seconds_and_never_zero() {
        assert_eq!(ttl_seconds(Duration::from_secs(900)), 900);
        assert_eq!(ttl_seconds(Duration::from_millis(1_500)), 1);
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }
}
