//! Read-through lookups for options, labels and texts.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{RepoError, TextsRepo, ValueRecordsRepo};
use crate::cache::OptionCache;
use crate::domain::entities::{TextContent, TextRecord, ValueRecord, validate_key};
use crate::domain::error::DomainError;
use crate::domain::language::Language;
use crate::domain::types::{RecordKind, ValueKind};

const SOURCE: &str = "application::lookup";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no {kind} with key `{key}`")]
    NotFound { kind: RecordKind, key: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct LookupService {
    values: Arc<dyn ValueRecordsRepo>,
    texts: Arc<dyn TextsRepo>,
    cache: Option<Arc<OptionCache>>,
    create_missing_items: bool,
}

impl LookupService {
    pub fn new(values: Arc<dyn ValueRecordsRepo>, texts: Arc<dyn TextsRepo>) -> Self {
        Self {
            values,
            texts,
            cache: None,
            create_missing_items: false,
        }
    }

    /// Set the lookup cache (optional).
    pub fn with_cache_opt(mut self, cache: Option<Arc<OptionCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Create blank records for unknown keys instead of reporting them.
    pub fn with_create_missing_items(mut self, enabled: bool) -> Self {
        self.create_missing_items = enabled;
        self
    }

    pub async fn get_option(&self, language: &Language, key: &str) -> Result<String, LookupError> {
        self.get_value(ValueKind::Option, language, key).await
    }

    pub async fn get_label(&self, language: &Language, key: &str) -> Result<String, LookupError> {
        self.get_value(ValueKind::Label, language, key).await
    }

    pub async fn get_text(
        &self,
        language: &Language,
        key: &str,
    ) -> Result<TextContent, LookupError> {
        let logical = RecordKind::Text.cache_key(key);
        if let Some(content) = self.cached::<TextContent>(language, &logical).await {
            return Ok(content);
        }

        let record = match self.texts.find_text(key).await? {
            Some(record) => record,
            None if self.create_missing_items => {
                validate_key(key)?;
                info!(target = SOURCE, kind = "text", key, "Creating missing record");
                self.texts.create_text_if_missing(key).await?
            }
            None => {
                return Err(LookupError::NotFound {
                    kind: RecordKind::Text,
                    key: key.to_string(),
                });
            }
        };

        let content = record.content();
        self.fill(language, &logical, &content).await;
        Ok(content)
    }

    /// Uncached record lookup, used to build admin edit links.
    pub async fn find_value_record(
        &self,
        kind: ValueKind,
        key: &str,
    ) -> Result<Option<ValueRecord>, LookupError> {
        Ok(self.values.find_value(kind, key).await?)
    }

    /// Uncached record lookup, used to build admin edit links.
    pub async fn find_text_record(&self, key: &str) -> Result<Option<TextRecord>, LookupError> {
        Ok(self.texts.find_text(key).await?)
    }

    async fn get_value(
        &self,
        kind: ValueKind,
        language: &Language,
        key: &str,
    ) -> Result<String, LookupError> {
        let logical = RecordKind::from(kind).cache_key(key);
        if let Some(value) = self.cached::<String>(language, &logical).await {
            return Ok(value);
        }

        let record = match self.values.find_value(kind, key).await? {
            Some(record) => record,
            None if self.create_missing_items => {
                validate_key(key)?;
                info!(target = SOURCE, kind = kind.as_str(), key, "Creating missing record");
                self.values.create_value_if_missing(kind, key).await?
            }
            None => {
                return Err(LookupError::NotFound {
                    kind: kind.into(),
                    key: key.to_string(),
                });
            }
        };

        self.fill(language, &logical, &record.value).await;
        Ok(record.value)
    }

    /// Cache read. Failures count as misses.
    async fn cached<T: DeserializeOwned>(&self, language: &Language, logical: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.get::<T>(language, logical).await {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    key = logical,
                    language = %language,
                    error = %err,
                    "Cache read failed; falling back to record store"
                );
                None
            }
        }
    }

    async fn fill<T: Serialize + ?Sized>(&self, language: &Language, logical: &str, value: &T) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(err) = cache.set(language, logical, value).await {
            warn!(
                target = SOURCE,
                key = logical,
                language = %language,
                error = %err,
                "Cache fill failed"
            );
        }
    }
}
