//! Index of every language that has written a cache entry.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::domain::language::Language;

use super::error::CacheError;
use super::store::{KeyValueStore, decode_string_set};

/// Grow-only set of languages kept under one well-known store key.
///
/// Entries are never removed, so deleting "every language" of a key means
/// deleting it for every language this index has seen.
#[derive(Clone)]
pub struct LanguageIndex {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl LanguageIndex {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Add `language` to the index. Idempotent.
    ///
    /// An unreadable index entry is replaced by `{language}` with a warning.
    pub async fn record(&self, language: &Language) -> Result<(), CacheError> {
        self.store.add_to_set(&self.key, language.as_str()).await?;
        Ok(())
    }

    /// Every language recorded so far. Empty when nothing was ever cached.
    ///
    /// Members that are not valid language codes are skipped with a warning;
    /// only an entry that is not a string array is reported as corrupt.
    pub async fn all(&self) -> Result<BTreeSet<Language>, CacheError> {
        let Some(value) = self.store.get(&self.key).await? else {
            return Ok(BTreeSet::new());
        };

        let members = decode_string_set(&value).map_err(|reason| CacheError::IndexCorrupt {
            key: self.key.clone(),
            reason,
        })?;

        Ok(members
            .iter()
            .filter_map(|code| match Language::new(code) {
                Ok(language) => Some(language),
                Err(err) => {
                    warn!(
                        key = %self.key,
                        member = %code,
                        error = %err,
                        "Skipping invalid member of language index"
                    );
                    None
                }
            })
            .collect())
    }
}
