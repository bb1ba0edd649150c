use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, UpsertValueParams, ValueRecordsRepo},
    domain::{entities::ValueRecord, types::ValueKind},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ValueRow {
    id: Uuid,
    key: String,
    value: String,
    updated_at: OffsetDateTime,
}

impl ValueRow {
    fn into_record(self, kind: ValueKind) -> ValueRecord {
        ValueRecord {
            id: self.id,
            kind,
            key: self.key,
            value: self.value,
            updated_at: self.updated_at,
        }
    }
}

// Table names come from `ValueKind::table`, never from input.
#[async_trait]
impl ValueRecordsRepo for PostgresRepositories {
    async fn find_value(
        &self,
        kind: ValueKind,
        key: &str,
    ) -> Result<Option<ValueRecord>, RepoError> {
        let sql = format!(
            "SELECT id, key, value, updated_at FROM {} WHERE key = $1",
            kind.table()
        );
        let row = sqlx::query_as::<_, ValueRow>(&sql)
            .bind(key)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|row| row.into_record(kind)))
    }

    async fn list_values(&self, kind: ValueKind) -> Result<Vec<ValueRecord>, RepoError> {
        let sql = format!(
            "SELECT id, key, value, updated_at FROM {} ORDER BY key",
            kind.table()
        );
        let rows = sqlx::query_as::<_, ValueRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|row| row.into_record(kind)).collect())
    }

    async fn upsert_value(
        &self,
        kind: ValueKind,
        params: UpsertValueParams,
    ) -> Result<ValueRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, key, value, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value,
                    updated_at = now()
            RETURNING id, key, value, updated_at
            "#,
            kind.table()
        );
        let row = sqlx::query_as::<_, ValueRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&params.key)
            .bind(&params.value)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into_record(kind))
    }

    async fn create_value_if_missing(
        &self,
        kind: ValueKind,
        key: &str,
    ) -> Result<ValueRecord, RepoError> {
        let insert = format!(
            "INSERT INTO {} (id, key) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
            kind.table()
        );
        sqlx::query(&insert)
            .bind(Uuid::new_v4())
            .bind(key)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.find_value(kind, key).await?.ok_or(RepoError::NotFound)
    }

    async fn delete_value(&self, kind: ValueKind, key: &str) -> Result<bool, RepoError> {
        let sql = format!("DELETE FROM {} WHERE key = $1", kind.table());
        let result = sqlx::query(&sql)
            .bind(key)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
