//! Article cache.
//!
//! The cache is never a source of truth: every read path falls back to storage and
//! every write is best-effort. Backends:
//!
//! - **memory**: in-process LRU with per-entry expiry, one copy per process
//! - **redis**: shared across processes
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"
//! expiry_seconds = 900
//! memory_capacity = 10000
//! ```

mod articles;
mod config;
mod keys;
mod lock;
mod redis_store;
mod store;

use std::sync::Arc;

pub use articles::ArticleCache;
pub(crate) use articles::{METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL};
pub use config::{CacheBackend, CacheConfig};
pub use keys::CacheKey;
pub use redis_store::RedisCacheStore;
pub use store::{CacheError, CacheStore, MemoryCacheStore};

/// Build the configured backend.
pub fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCacheStore::new(config))),
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| CacheError::backend("cache.redis_url is required for redis"))?;
            Ok(Arc::new(RedisCacheStore::connect(
                url,
                config.key_prefix.clone(),
            )?))
        }
    }
}
