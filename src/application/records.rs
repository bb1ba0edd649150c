//! Record writes for the admin surface. Every successful write drops the
//! record's cached lookups in every language.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    RepoError, TextsRepo, UpsertTextParams, UpsertValueParams, ValueRecordsRepo,
};
use crate::cache::{CacheError, InvalidationResult, OptionCache};
use crate::domain::entities::{
    MAX_TITLE_LEN, MAX_VALUE_LEN, TextRecord, ValueRecord, validate_key, validate_max_len,
};
use crate::domain::error::DomainError;
use crate::domain::language::Language;
use crate::domain::types::{RecordKind, ValueKind};

const SOURCE: &str = "application::records";

#[derive(Debug, Error)]
pub enum AdminRecordError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone)]
pub struct SaveValueCommand {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct SaveTextCommand {
    pub key: String,
    pub title: String,
    pub text: String,
    pub notes: String,
}

/// A persisted record and what happened to its cached lookups.
///
/// `invalidation` is `None` when caching is disabled.
#[derive(Debug, Clone, Serialize)]
pub struct RecordWrite<T> {
    pub record: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation: Option<InvalidationResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordDeletion {
    pub kind: RecordKind,
    pub key: String,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation: Option<InvalidationResult>,
}

#[derive(Clone)]
pub struct AdminRecordService {
    values: Arc<dyn ValueRecordsRepo>,
    texts: Arc<dyn TextsRepo>,
    cache: Option<Arc<OptionCache>>,
}

impl AdminRecordService {
    pub fn new(values: Arc<dyn ValueRecordsRepo>, texts: Arc<dyn TextsRepo>) -> Self {
        Self {
            values,
            texts,
            cache: None,
        }
    }

    /// Set the lookup cache to invalidate (optional).
    pub fn with_cache_opt(mut self, cache: Option<Arc<OptionCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub async fn list_values(&self, kind: ValueKind) -> Result<Vec<ValueRecord>, AdminRecordError> {
        Ok(self.values.list_values(kind).await?)
    }

    pub async fn find_value(
        &self,
        kind: ValueKind,
        key: &str,
    ) -> Result<Option<ValueRecord>, AdminRecordError> {
        Ok(self.values.find_value(kind, key).await?)
    }

    pub async fn list_texts(&self) -> Result<Vec<TextRecord>, AdminRecordError> {
        Ok(self.texts.list_texts().await?)
    }

    pub async fn find_text(&self, key: &str) -> Result<Option<TextRecord>, AdminRecordError> {
        Ok(self.texts.find_text(key).await?)
    }

    pub async fn save_option(
        &self,
        command: SaveValueCommand,
    ) -> Result<RecordWrite<ValueRecord>, AdminRecordError> {
        self.save_value(ValueKind::Option, command).await
    }

    pub async fn save_label(
        &self,
        command: SaveValueCommand,
    ) -> Result<RecordWrite<ValueRecord>, AdminRecordError> {
        self.save_value(ValueKind::Label, command).await
    }

    pub async fn save_value(
        &self,
        kind: ValueKind,
        command: SaveValueCommand,
    ) -> Result<RecordWrite<ValueRecord>, AdminRecordError> {
        let key = command.key.trim().to_string();
        validate_key(&key)?;
        validate_max_len("value", &command.value, MAX_VALUE_LEN)?;

        let record = self
            .values
            .upsert_value(
                kind,
                UpsertValueParams {
                    key,
                    value: command.value,
                },
            )
            .await?;
        info!(target = SOURCE, kind = kind.as_str(), key = %record.key, "Saved record");

        let invalidation = self.invalidate(kind.into(), &record.key).await;
        Ok(RecordWrite {
            record,
            invalidation,
        })
    }

    pub async fn save_text(
        &self,
        command: SaveTextCommand,
    ) -> Result<RecordWrite<TextRecord>, AdminRecordError> {
        let key = command.key.trim().to_string();
        validate_key(&key)?;
        validate_max_len("title", &command.title, MAX_TITLE_LEN)?;

        let record = self
            .texts
            .upsert_text(UpsertTextParams {
                key,
                title: command.title,
                text: command.text,
                notes: command.notes,
            })
            .await?;
        info!(target = SOURCE, kind = "text", key = %record.key, "Saved record");

        let invalidation = self.invalidate(RecordKind::Text, &record.key).await;
        Ok(RecordWrite {
            record,
            invalidation,
        })
    }

    pub async fn delete_option(&self, key: &str) -> Result<RecordDeletion, AdminRecordError> {
        self.delete_value(ValueKind::Option, key).await
    }

    pub async fn delete_label(&self, key: &str) -> Result<RecordDeletion, AdminRecordError> {
        self.delete_value(ValueKind::Label, key).await
    }

    pub async fn delete_value(
        &self,
        kind: ValueKind,
        key: &str,
    ) -> Result<RecordDeletion, AdminRecordError> {
        let deleted = self.values.delete_value(kind, key).await?;
        self.finish_delete(kind.into(), key, deleted).await
    }

    pub async fn delete_text(&self, key: &str) -> Result<RecordDeletion, AdminRecordError> {
        let deleted = self.texts.delete_text(key).await?;
        self.finish_delete(RecordKind::Text, key, deleted).await
    }

    /// Drop the cached lookups of `kind`/`key` in every language.
    ///
    /// Returns `None` when caching is disabled.
    pub async fn invalidate(&self, kind: RecordKind, key: &str) -> Option<InvalidationResult> {
        let cache = self.cache.as_ref()?;
        Some(cache.delete_all_languages(&kind.cache_key(key)).await)
    }

    /// Languages recorded in the cache index, or `None` when caching is disabled.
    pub async fn cached_languages(
        &self,
    ) -> Result<Option<BTreeSet<Language>>, AdminRecordError> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        Ok(Some(cache.index().all().await?))
    }

    async fn finish_delete(
        &self,
        kind: RecordKind,
        key: &str,
        deleted: bool,
    ) -> Result<RecordDeletion, AdminRecordError> {
        if deleted {
            info!(target = SOURCE, kind = kind.as_str(), key, "Deleted record");
        }
        // Stale entries may exist even when the row was already gone.
        let invalidation = self.invalidate(kind, key).await;
        Ok(RecordDeletion {
            kind,
            key: key.to_string(),
            deleted,
            invalidation,
        })
    }
}
