//! In-process record store for `storage.backend = "memory"` and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    RepoError, TextsRepo, UpsertTextParams, UpsertValueParams, ValueRecordsRepo,
};
use crate::domain::entities::{TextRecord, ValueRecord};
use crate::domain::types::ValueKind;

/// Records are lost on restart. Upserts keep the id of an existing key.
#[derive(Debug, Default)]
pub struct MemoryRepositories {
    values: DashMap<(ValueKind, String), ValueRecord>,
    texts: DashMap<String, TextRecord>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ValueRecordsRepo for MemoryRepositories {
    async fn find_value(
        &self,
        kind: ValueKind,
        key: &str,
    ) -> Result<Option<ValueRecord>, RepoError> {
        Ok(self
            .values
            .get(&(kind, key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn list_values(&self, kind: ValueKind) -> Result<Vec<ValueRecord>, RepoError> {
        let mut records: Vec<ValueRecord> = self
            .values
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    async fn upsert_value(
        &self,
        kind: ValueKind,
        params: UpsertValueParams,
    ) -> Result<ValueRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = match self.values.entry((kind, params.key.clone())) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                record.value = params.value;
                record.updated_at = now;
                record.clone()
            }
            Entry::Vacant(vacant) => vacant
                .insert(ValueRecord {
                    id: Uuid::new_v4(),
                    kind,
                    key: params.key,
                    value: params.value,
                    updated_at: now,
                })
                .clone(),
        };
        Ok(record)
    }

    async fn create_value_if_missing(
        &self,
        kind: ValueKind,
        key: &str,
    ) -> Result<ValueRecord, RepoError> {
        let record = self
            .values
            .entry((kind, key.to_string()))
            .or_insert_with(|| ValueRecord {
                id: Uuid::new_v4(),
                kind,
                key: key.to_string(),
                value: String::new(),
                updated_at: OffsetDateTime::now_utc(),
            })
            .clone();
        Ok(record)
    }

    async fn delete_value(&self, kind: ValueKind, key: &str) -> Result<bool, RepoError> {
        Ok(self.values.remove(&(kind, key.to_string())).is_some())
    }
}

#[async_trait]
impl TextsRepo for MemoryRepositories {
    async fn find_text(&self, key: &str) -> Result<Option<TextRecord>, RepoError> {
        Ok(self.texts.get(key).map(|entry| entry.value().clone()))
    }

    async fn list_texts(&self) -> Result<Vec<TextRecord>, RepoError> {
        let mut records: Vec<TextRecord> =
            self.texts.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    async fn upsert_text(&self, params: UpsertTextParams) -> Result<TextRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = match self.texts.entry(params.key.clone()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                record.title = params.title;
                record.text = params.text;
                record.notes = params.notes;
                record.updated_at = now;
                record.clone()
            }
            Entry::Vacant(vacant) => vacant
                .insert(TextRecord {
                    id: Uuid::new_v4(),
                    key: params.key,
                    title: params.title,
                    text: params.text,
                    notes: params.notes,
                    updated_at: now,
                })
                .clone(),
        };
        Ok(record)
    }

    async fn create_text_if_missing(&self, key: &str) -> Result<TextRecord, RepoError> {
        let record = self
            .texts
            .entry(key.to_string())
            .or_insert_with(|| TextRecord {
                id: Uuid::new_v4(),
                key: key.to_string(),
                title: String::new(),
                text: String::new(),
                notes: String::new(),
                updated_at: OffsetDateTime::now_utc(),
            })
            .clone();
        Ok(record)
    }

    async fn delete_text(&self, key: &str) -> Result<bool, RepoError> {
        Ok(self.texts.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_keeps_identity_and_lists_by_key() {
        let repo = MemoryRepositories::new();
        let first = repo
            .upsert_value(
                ValueKind::Option,
                UpsertValueParams {
                    key: "site_title".into(),
                    value: "Acme".into(),
                },
            )
            .await
            .unwrap();
        let second = repo
            .upsert_value(
                ValueKind::Option,
                UpsertValueParams {
                    key: "site_title".into(),
                    value: "Acme Corp".into(),
                },
            )
            .await
            .unwrap();
        repo.upsert_value(
            ValueKind::Option,
            UpsertValueParams {
                key: "footer".into(),
                value: "(c)".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.value, "Acme Corp");

        let keys: Vec<_> = repo
            .list_values(ValueKind::Option)
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.key)
            .collect();
        assert_eq!(keys, vec!["footer", "site_title"]);
        assert!(repo.list_values(ValueKind::Label).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn options_and_labels_do_not_collide() {
        let repo = MemoryRepositories::new();
        repo.create_value_if_missing(ValueKind::Label, "menu")
            .await
            .unwrap();

        assert!(repo.find_value(ValueKind::Option, "menu").await.unwrap().is_none());
        assert!(repo.delete_value(ValueKind::Label, "menu").await.unwrap());
        assert!(!repo.delete_value(ValueKind::Label, "menu").await.unwrap());
    }

    #[tokio::test]
    async fn create_if_missing_keeps_existing_text() {
        let repo = MemoryRepositories::new();
        repo.upsert_text(UpsertTextParams {
            key: "about".into(),
            title: "About".into(),
            text: "Body".into(),
            notes: String::new(),
        })
        .await
        .unwrap();

        let existing = repo.create_text_if_missing("about").await.unwrap();
        assert_eq!(existing.title, "About");
    }
}
