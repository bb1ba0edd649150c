use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::records::{
    RecordDeletion, RecordWrite, SaveTextCommand, SaveValueCommand,
};
use crate::cache::InvalidationResult;
use crate::domain::entities::{TextRecord, ValueRecord};
use crate::domain::language::Language;
use crate::domain::types::{RecordKind, ValueKind};

use super::error::ApiError;
use super::middleware::{log_responses, set_request_context};
use super::state::HttpState;

pub fn build_admin_router(state: HttpState) -> Router {
    Router::new()
        .route("/admin/options", get(list_options))
        .route(
            "/admin/options/{key}",
            get(find_option).put(save_option).delete(delete_option),
        )
        .route("/admin/labels", get(list_labels))
        .route(
            "/admin/labels/{key}",
            get(find_label).put(save_label).delete(delete_label),
        )
        .route("/admin/texts", get(list_texts))
        .route(
            "/admin/texts/{key}",
            get(find_text).put(save_text).delete(delete_text),
        )
        .route("/admin/cache/languages", get(cached_languages))
        .route("/admin/cache/invalidate", post(invalidate))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

#[derive(Debug, Deserialize)]
pub struct SaveValueRequest {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveTextRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub kind: RecordKind,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub kind: RecordKind,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation: Option<InvalidationResult>,
}

#[derive(Debug, Serialize)]
pub struct CachedLanguagesResponse {
    pub enabled: bool,
    pub languages: BTreeSet<Language>,
}

/// Text as listed in the admin: notes also shown without markup.
#[derive(Debug, Serialize)]
pub struct TextView {
    pub id: Uuid,
    pub key: String,
    pub title: String,
    pub text: String,
    pub notes: String,
    pub notes_plain: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<TextRecord> for TextView {
    fn from(record: TextRecord) -> Self {
        let notes_plain = record.notes_without_tags();
        Self {
            id: record.id,
            key: record.key,
            title: record.title,
            text: record.text,
            notes: record.notes,
            notes_plain,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

async fn list_values(
    state: &HttpState,
    kind: ValueKind,
) -> Result<Json<ListResponse<ValueRecord>>, ApiError> {
    let items = state.records.list_values(kind).await?;
    Ok(Json(ListResponse { items }))
}

async fn find_value(
    state: &HttpState,
    kind: ValueKind,
    key: &str,
) -> Result<Json<ValueRecord>, ApiError> {
    state
        .records
        .find_value(kind, key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Record not found", Some(key.to_string())))
}

async fn save_value(
    state: &HttpState,
    kind: ValueKind,
    key: String,
    payload: SaveValueRequest,
) -> Result<Json<RecordWrite<ValueRecord>>, ApiError> {
    let write = state
        .records
        .save_value(
            kind,
            SaveValueCommand {
                key,
                value: payload.value,
            },
        )
        .await?;
    Ok(Json(write))
}

async fn delete_value(
    state: &HttpState,
    kind: ValueKind,
    key: &str,
) -> Result<Json<RecordDeletion>, ApiError> {
    deletion_response(state.records.delete_value(kind, key).await?)
}

fn deletion_response(deletion: RecordDeletion) -> Result<Json<RecordDeletion>, ApiError> {
    if !deletion.deleted {
        return Err(ApiError::not_found("Record not found", Some(deletion.key)));
    }
    Ok(Json(deletion))
}

async fn list_options(
    State(state): State<HttpState>,
) -> Result<Json<ListResponse<ValueRecord>>, ApiError> {
    list_values(&state, ValueKind::Option).await
}

async fn find_option(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Json<ValueRecord>, ApiError> {
    find_value(&state, ValueKind::Option, &key).await
}

async fn save_option(
    State(state): State<HttpState>,
    Path(key): Path<String>,
    Json(payload): Json<SaveValueRequest>,
) -> Result<Json<RecordWrite<ValueRecord>>, ApiError> {
    save_value(&state, ValueKind::Option, key, payload).await
}

async fn delete_option(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Json<RecordDeletion>, ApiError> {
    delete_value(&state, ValueKind::Option, &key).await
}

async fn list_labels(
    State(state): State<HttpState>,
) -> Result<Json<ListResponse<ValueRecord>>, ApiError> {
    list_values(&state, ValueKind::Label).await
}

async fn find_label(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Json<ValueRecord>, ApiError> {
    find_value(&state, ValueKind::Label, &key).await
}

async fn save_label(
    State(state): State<HttpState>,
    Path(key): Path<String>,
    Json(payload): Json<SaveValueRequest>,
) -> Result<Json<RecordWrite<ValueRecord>>, ApiError> {
    save_value(&state, ValueKind::Label, key, payload).await
}

async fn delete_label(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Json<RecordDeletion>, ApiError> {
    delete_value(&state, ValueKind::Label, &key).await
}

async fn list_texts(
    State(state): State<HttpState>,
) -> Result<Json<ListResponse<TextView>>, ApiError> {
    let items = state
        .records
        .list_texts()
        .await?
        .into_iter()
        .map(TextView::from)
        .collect();
    Ok(Json(ListResponse { items }))
}

async fn find_text(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Json<TextView>, ApiError> {
    state
        .records
        .find_text(&key)
        .await?
        .map(|record| Json(TextView::from(record)))
        .ok_or_else(|| ApiError::not_found("Record not found", Some(key)))
}

async fn save_text(
    State(state): State<HttpState>,
    Path(key): Path<String>,
    Json(payload): Json<SaveTextRequest>,
) -> Result<Json<RecordWrite<TextRecord>>, ApiError> {
    let write = state
        .records
        .save_text(SaveTextCommand {
            key,
            title: payload.title,
            text: payload.text,
            notes: payload.notes,
        })
        .await?;
    Ok(Json(write))
}

async fn delete_text(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Json<RecordDeletion>, ApiError> {
    deletion_response(state.records.delete_text(&key).await?)
}

async fn cached_languages(
    State(state): State<HttpState>,
) -> Result<Json<CachedLanguagesResponse>, ApiError> {
    let response = match state.records.cached_languages().await? {
        Some(languages) => CachedLanguagesResponse {
            enabled: true,
            languages,
        },
        None => CachedLanguagesResponse {
            enabled: false,
            languages: BTreeSet::new(),
        },
    };
    Ok(Json(response))
}

async fn invalidate(
    State(state): State<HttpState>,
    Json(payload): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let key = payload.key.trim().to_string();
    if key.is_empty() {
        return Err(ApiError::bad_request(
            "Key must not be empty",
            Some("provide the record key to invalidate".to_string()),
        ));
    }

    let invalidation = state.records.invalidate(payload.kind, &key).await;
    Ok(Json(InvalidateResponse {
        kind: payload.kind,
        key,
        invalidation,
    }))
}
