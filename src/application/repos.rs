//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{TextRecord, ValueRecord};
use crate::domain::types::ValueKind;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UpsertValueParams {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct UpsertTextParams {
    pub key: String,
    pub title: String,
    pub text: String,
    pub notes: String,
}

/// Options and labels share one shape and differ only by table.
#[async_trait]
pub trait ValueRecordsRepo: Send + Sync {
    async fn find_value(&self, kind: ValueKind, key: &str)
    -> Result<Option<ValueRecord>, RepoError>;

    /// All records of `kind`, ordered by key.
    async fn list_values(&self, kind: ValueKind) -> Result<Vec<ValueRecord>, RepoError>;

    /// Insert or update by key.
    async fn upsert_value(
        &self,
        kind: ValueKind,
        params: UpsertValueParams,
    ) -> Result<ValueRecord, RepoError>;

    /// Insert a blank record unless one exists, then return the stored row.
    async fn create_value_if_missing(
        &self,
        kind: ValueKind,
        key: &str,
    ) -> Result<ValueRecord, RepoError>;

    /// Returns whether a row was removed.
    async fn delete_value(&self, kind: ValueKind, key: &str) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait TextsRepo: Send + Sync {
    async fn find_text(&self, key: &str) -> Result<Option<TextRecord>, RepoError>;

    /// All texts, ordered by key.
    async fn list_texts(&self) -> Result<Vec<TextRecord>, RepoError>;

    async fn upsert_text(&self, params: UpsertTextParams) -> Result<TextRecord, RepoError>;

    async fn create_text_if_missing(&self, key: &str) -> Result<TextRecord, RepoError>;

    async fn delete_text(&self, key: &str) -> Result<bool, RepoError>;
}
