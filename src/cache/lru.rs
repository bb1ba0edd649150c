//! Bounded in-process store with least-recently-used eviction.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, warn};

use super::store::{KeyValueStore, StoreError, encode_string_set, members_or_reset};

const SOURCE: &str = "cache::lru";

struct Inner {
    values: LruCache<String, Value>,
    /// Sets written through `add_to_set`. Never evicted.
    pinned: HashMap<String, Value>,
}

/// Bounded backend. Plain values compete for `capacity` slots; set entries
/// such as the language index are held outside the eviction order.
pub struct LruStore {
    inner: RwLock<Inner>,
}

impl LruStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                values: LruCache::new(capacity),
                pinned: HashMap::new(),
            }),
        }
    }

    /// Number of evictable entries currently held.
    pub fn len(&self) -> usize {
        self.read("len").values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            warn!(
                op,
                target_module = SOURCE,
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                "Recovered from poisoned store lock"
            );
            poisoned.into_inner()
        })
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            warn!(
                op,
                target_module = SOURCE,
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                "Recovered from poisoned store lock"
            );
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl KeyValueStore for LruStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        // Lookups promote the entry, so they need the write side.
        let mut inner = self.write("get");
        if let Some(value) = inner.pinned.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(inner.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self.write("set");
        if let Some(slot) = inner.pinned.get_mut(key) {
            *slot = value;
            return Ok(());
        }

        if let Some((evicted, _)) = inner.values.push(key.to_string(), value)
            && evicted != key
        {
            counter!("qoptions_cache_lru_evict_total").increment(1);
            debug!(target = SOURCE, evicted = %evicted, "Evicted least recently used entry");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.write("delete");
        inner.pinned.remove(key);
        inner.values.pop(key);
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut inner = self.write("add_to_set");
        // A plain value written under the same key moves to the pinned side.
        let current = match inner.pinned.remove(key) {
            Some(value) => Some(value),
            None => inner.values.pop(key),
        };
        let (mut members, _) = members_or_reset(key, current.as_ref());
        members.insert(member.to_string());
        inner
            .pinned
            .insert(key.to_string(), encode_string_set(&members));
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "lru"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn store(capacity: usize) -> LruStore {
        LruStore::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let store = store(2);
        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!(2)).await.unwrap();
        // Touch `a` so `b` becomes the eviction candidate.
        store.get("a").await.unwrap();
        store.set("c", json!(3)).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get("b").await.unwrap(), None);
        assert_eq!(store.get("c").await.unwrap(), Some(json!(3)));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn replacing_a_key_is_not_an_eviction() {
        let store = store(1);
        store.set("a", json!(1)).await.unwrap();
        store.set("a", json!(2)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn set_entries_survive_value_pressure() {
        let store = store(1);
        store.add_to_set("langs", "en").await.unwrap();
        store.add_to_set("langs", "fr").await.unwrap();
        for i in 0..10 {
            store.set(&format!("k{i}"), json!(i)).await.unwrap();
        }

        assert_eq!(store.get("langs").await.unwrap(), Some(json!(["en", "fr"])));

        store.delete("langs").await.unwrap();
        assert_eq!(store.get("langs").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwriting_a_set_entry_keeps_it_pinned() {
        let store = store(1);
        store.add_to_set("langs", "en").await.unwrap();
        store.set("langs", json!("garbage")).await.unwrap();
        store.set("other", json!(1)).await.unwrap();

        assert_eq!(store.get("langs").await.unwrap(), Some(json!("garbage")));
    }
}
