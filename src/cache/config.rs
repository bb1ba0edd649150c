//! Cache configuration.
//!
//! Selects the backing key-value store and the key layout used by
//! [`OptionCache`](super::OptionCache).

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Deserialize;

use super::lru::LruStore;
use super::memory::MemoryStore;
use super::store::KeyValueStore;

pub(crate) const DEFAULT_KEY_PREFIX: &str = "qopt_";
pub(crate) const DEFAULT_LANGUAGES_KEY: &str = "qoptlangs";
pub(crate) const DEFAULT_LRU_CAPACITY: usize = 10_000;

/// Backing store implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// Unbounded concurrent map.
    Memory,
    /// Bounded map with least-recently-used eviction.
    Lru,
}

impl CacheBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheBackendKind::Memory => "memory",
            CacheBackendKind::Lru => "lru",
        }
    }
}

/// Cache configuration from `qoptions.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache lookups at all. When off, every lookup reads the record store.
    pub enabled: bool,
    /// Backing store implementation.
    pub backend: CacheBackendKind,
    /// Maximum entries held by the `lru` backend.
    pub lru_capacity: usize,
    /// Namespace prepended to every composite key.
    pub key_prefix: String,
    /// Well-known key holding the language index.
    pub languages_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            lru_capacity: DEFAULT_LRU_CAPACITY,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            languages_key: DEFAULT_LANGUAGES_KEY.to_string(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            lru_capacity: settings.lru_capacity.get(),
            key_prefix: settings.key_prefix.clone(),
            languages_key: settings.languages_key.clone(),
        }
    }
}

impl CacheConfig {
    /// Returns the LRU capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn lru_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.lru_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Build the configured backing store.
    pub fn build_store(&self) -> Arc<dyn KeyValueStore> {
        match self.backend {
            CacheBackendKind::Memory => Arc::new(MemoryStore::new()),
            CacheBackendKind::Lru => Arc::new(LruStore::new(self.lru_capacity_non_zero())),
        }
    }
}
