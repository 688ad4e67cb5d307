//! Cache configuration.
//!
//! Selects the cache backend and the fixed per-entry expiry via `webook.toml`:
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! redis_url = "redis://localhost:6379"
//! expiry_seconds = 900
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_EXPIRY_SECS: u64 = 15 * 60;
const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// In-process LRU, one per process.
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    /// Prepended as `{prefix}:` to every key when non-empty.
    pub key_prefix: String,
    /// Expiry applied to every entry written.
    pub expiry: Duration,
    /// Maximum entries held by the in-process backend.
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            key_prefix: String::new(),
            expiry: Duration::from_secs(DEFAULT_EXPIRY_SECS),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            key_prefix: settings.key_prefix.clone(),
            expiry: settings.expiry,
            memory_capacity: settings.memory_capacity.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.expiry, Duration::from_secs(900));
        assert_eq!(config.memory_capacity, 10_000);
        assert!(config.key_prefix.is_empty());
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            memory_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.memory_capacity_non_zero().get(), 1);
    }
}
