use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, TextsRepo, UpsertTextParams},
    domain::entities::TextRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TextRow {
    id: Uuid,
    key: String,
    title: String,
    text: String,
    notes: String,
    updated_at: OffsetDateTime,
}

impl From<TextRow> for TextRecord {
    fn from(row: TextRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            title: row.title,
            text: row.text,
            notes: row.notes,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl TextsRepo for PostgresRepositories {
    async fn find_text(&self, key: &str) -> Result<Option<TextRecord>, RepoError> {
        let row = sqlx::query_as::<_, TextRow>(
            r#"
            SELECT id, key, title, text, notes, updated_at
            FROM texts
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TextRecord::from))
    }

    async fn list_texts(&self) -> Result<Vec<TextRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TextRow>(
            r#"
            SELECT id, key, title, text, notes, updated_at
            FROM texts
            ORDER BY key
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TextRecord::from).collect())
    }

    async fn upsert_text(&self, params: UpsertTextParams) -> Result<TextRecord, RepoError> {
        let row = sqlx::query_as::<_, TextRow>(
            r#"
            INSERT INTO texts (id, key, title, text, notes, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (key) DO UPDATE
                SET title = EXCLUDED.title,
                    text = EXCLUDED.text,
                    notes = EXCLUDED.notes,
                    updated_at = now()
            RETURNING id, key, title, text, notes, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&params.key)
        .bind(&params.title)
        .bind(&params.text)
        .bind(&params.notes)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn create_text_if_missing(&self, key: &str) -> Result<TextRecord, RepoError> {
        sqlx::query("INSERT INTO texts (id, key) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(key)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.find_text(key).await?.ok_or(RepoError::NotFound)
    }

    async fn delete_text(&self, key: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM texts WHERE key = $1")
            .bind(key)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
