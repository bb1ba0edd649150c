//! Unbounded in-process store on a sharded concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::store::{KeyValueStore, StoreError, encode_string_set, members_or_reset};

/// Default backend. Entries live until deleted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    /// Atomic: the shard stays write-locked for the whole update.
    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(Value::Array(Vec::new()));
        let (mut members, repaired) = members_or_reset(key, Some(entry.value()));
        if members.insert(member.to_string()) || repaired {
            *entry.value_mut() = encode_string_set(&members);
        }
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", json!("one")).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!("one")));

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_set_adds_keep_every_member() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.add_to_set("langs", &format!("l{i}")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = store.get("langs").await.unwrap().expect("set stored");
        assert_eq!(stored.as_array().map(Vec::len), Some(32));
    }
}
