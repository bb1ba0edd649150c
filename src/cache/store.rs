//! Backing key-value store contract.
//!
//! The option cache only needs get/set/delete by opaque string key plus a
//! set-add primitive for the language index. Values are JSON so any
//! serializable payload can be cached.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Errors raised by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend-specific failure (connection, I/O, ...).
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Key-value store the option cache is layered on.
///
/// Implementations must tolerate concurrent calls. Per-key atomicity is the
/// store's responsibility; nothing above it takes locks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Add `member` to the string set stored under `key`.
    ///
    /// The default body is a plain read-modify-write: two writers adding
    /// different members at the same time can lose one of the updates. Stores
    /// with a native set-add override this with an atomic version. An entry
    /// that does not hold a string set is replaced by a set holding `member`.
    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let current = self.get(key).await?;
        let (mut members, repaired) = members_or_reset(key, current.as_ref());
        if members.insert(member.to_string()) || repaired {
            self.set(key, encode_string_set(&members)).await?;
        }
        Ok(())
    }

    /// Returns the backend type as a string identifier.
    fn backend_type(&self) -> &'static str;
}

/// Decode a stored string set. `null` counts as an empty set.
pub(crate) fn decode_string_set(value: &Value) -> Result<BTreeSet<String>, String> {
    match value {
        Value::Null => Ok(BTreeSet::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(member) => Ok(member.clone()),
                other => Err(format!("expected string member, found `{other}`")),
            })
            .collect(),
        other => Err(format!("expected array of strings, found `{other}`")),
    }
}

/// Encode a string set in sorted order.
pub(crate) fn encode_string_set(members: &BTreeSet<String>) -> Value {
    Value::Array(members.iter().cloned().map(Value::String).collect())
}

/// Decode the set under `key`, falling back to an empty set when the entry is
/// unreadable. The flag reports whether the entry must be rewritten.
pub(crate) fn members_or_reset(key: &str, value: Option<&Value>) -> (BTreeSet<String>, bool) {
    let Some(value) = value else {
        return (BTreeSet::new(), false);
    };

    match decode_string_set(value) {
        Ok(members) => (members, false),
        Err(reason) => {
            warn!(
                key,
                reason = %reason,
                "Replacing unreadable string set in cache store"
            );
            (BTreeSet::new(), true)
        }
    }
}
