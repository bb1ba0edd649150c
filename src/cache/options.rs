//! Language-qualified cache over a [`KeyValueStore`].

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::language::Language;

use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::KeyScheme;
use super::languages::LanguageIndex;
use super::store::KeyValueStore;

const SOURCE: &str = "cache::options";

/// One language whose entry could not be removed, or the index itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidationFailure {
    /// The language index could not be read; nothing was deleted.
    IndexUnreadable { detail: String },
    /// Deleting the entry for `language` failed.
    Delete { language: Language, detail: String },
}

/// Outcome of [`OptionCache::delete_all_languages`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvalidationResult {
    Complete {
        invalidated: Vec<Language>,
    },
    PartialFailure {
        invalidated: Vec<Language>,
        failures: Vec<InvalidationFailure>,
    },
}

impl InvalidationResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, InvalidationResult::Complete { .. })
    }

    pub fn invalidated(&self) -> &[Language] {
        match self {
            InvalidationResult::Complete { invalidated }
            | InvalidationResult::PartialFailure { invalidated, .. } => invalidated,
        }
    }

    pub fn failures(&self) -> &[InvalidationFailure] {
        match self {
            InvalidationResult::Complete { .. } => &[],
            InvalidationResult::PartialFailure { failures, .. } => failures,
        }
    }
}

/// Caches values per `(language, logical key)` and can drop a logical key in
/// every language it was ever cached in.
///
/// ```text
/// set(en, "qo_o_site_title", "Acme")
///   -> qoptlangs              = ["en"]
///   -> qopt_qo_o_site_title_en = "Acme"
/// ```
#[derive(Clone)]
pub struct OptionCache {
    store: Arc<dyn KeyValueStore>,
    index: LanguageIndex,
    keys: KeyScheme,
}

impl OptionCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        key_prefix: impl Into<String>,
        languages_key: impl Into<String>,
    ) -> Self {
        Self {
            index: LanguageIndex::new(store.clone(), languages_key),
            keys: KeyScheme::new(key_prefix),
            store,
        }
    }

    /// Build a cache on the configured backend, or `None` when caching is off.
    pub fn from_config(config: &CacheConfig) -> Option<Arc<Self>> {
        if !config.enabled {
            return None;
        }
        Some(Arc::new(Self::new(
            config.build_store(),
            config.key_prefix.clone(),
            config.languages_key.clone(),
        )))
    }

    pub fn index(&self) -> &LanguageIndex {
        &self.index
    }

    pub fn backend_type(&self) -> &'static str {
        self.store.backend_type()
    }

    pub async fn get<T>(&self, language: &Language, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        let composite = self.keys.composite(key, language);
        let Some(value) = self.store.get(&composite).await? else {
            counter!("qoptions_cache_miss_total").increment(1);
            return Ok(None);
        };

        counter!("qoptions_cache_hit_total").increment(1);
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| CacheError::Decode {
                key: composite,
                source,
            })
    }

    /// Cache `value`. The language is indexed before the value is written.
    pub async fn set<T>(&self, language: &Language, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let composite = self.keys.composite(key, language);
        let encoded = serde_json::to_value(value).map_err(|source| CacheError::Encode {
            key: composite.clone(),
            source,
        })?;

        self.index.record(language).await?;
        self.store.set(&composite, encoded).await?;
        counter!("qoptions_cache_set_total").increment(1);
        debug!(target = SOURCE, key = %composite, "Cached lookup");
        Ok(())
    }

    pub async fn delete(&self, language: &Language, key: &str) -> Result<(), CacheError> {
        let composite = self.keys.composite(key, language);
        self.store.delete(&composite).await?;
        Ok(())
    }

    /// Delete `key` in every indexed language.
    ///
    /// Never fails: an unreadable index leaves the store untouched, and
    /// per-language delete failures are collected into the result.
    pub async fn delete_all_languages(&self, key: &str) -> InvalidationResult {
        counter!("qoptions_cache_invalidation_total").increment(1);

        let languages = match self.index.all().await {
            Ok(languages) => languages,
            Err(err) => {
                counter!("qoptions_cache_invalidation_partial_total").increment(1);
                warn!(
                    target = SOURCE,
                    key,
                    error = %err,
                    "Skipping invalidation; language index is unreadable"
                );
                return InvalidationResult::PartialFailure {
                    invalidated: Vec::new(),
                    failures: vec![InvalidationFailure::IndexUnreadable {
                        detail: err.to_string(),
                    }],
                };
            }
        };

        let mut invalidated = Vec::with_capacity(languages.len());
        let mut failures = Vec::new();
        for language in languages {
            let composite = self.keys.composite(key, &language);
            match self.store.delete(&composite).await {
                Ok(()) => invalidated.push(language),
                Err(err) => failures.push(InvalidationFailure::Delete {
                    language,
                    detail: err.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            debug!(
                target = SOURCE,
                key,
                languages = invalidated.len(),
                "Invalidated key in all languages"
            );
            return InvalidationResult::Complete { invalidated };
        }

        counter!("qoptions_cache_invalidation_partial_total").increment(1);
        warn!(
            target = SOURCE,
            key,
            invalidated = invalidated.len(),
            failed = failures.len(),
            "Invalidation left stale entries"
        );
        InvalidationResult::PartialFailure {
            invalidated,
            failures,
        }
    }
}
