use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, middleware as axum_middleware, routing::get};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::domain::language::Language;

use super::error::ApiError;
use super::language::RequestLanguage;
use super::middleware::{log_responses, set_request_context};
use super::state::HttpState;

#[derive(Debug, Serialize)]
pub struct ValueLookup {
    pub key: String,
    pub language: Language,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct TextLookup {
    pub key: String,
    pub language: Language,
    pub title: String,
    pub text: String,
}

pub fn build_public_router(state: HttpState) -> Router {
    Router::new()
        .route("/options/{key}", get(get_option))
        .route("/labels/{key}", get(get_label))
        .route("/texts/{key}", get(get_text))
        .route("/health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn get_option(
    State(state): State<HttpState>,
    RequestLanguage(language): RequestLanguage,
    Path(key): Path<String>,
) -> Result<Json<ValueLookup>, ApiError> {
    let value = state.lookup.get_option(&language, &key).await?;
    Ok(Json(ValueLookup {
        key,
        language,
        value,
    }))
}

async fn get_label(
    State(state): State<HttpState>,
    RequestLanguage(language): RequestLanguage,
    Path(key): Path<String>,
) -> Result<Json<ValueLookup>, ApiError> {
    let value = state.lookup.get_label(&language, &key).await?;
    Ok(Json(ValueLookup {
        key,
        language,
        value,
    }))
}

async fn get_text(
    State(state): State<HttpState>,
    RequestLanguage(language): RequestLanguage,
    Path(key): Path<String>,
) -> Result<Json<TextLookup>, ApiError> {
    let content = state.lookup.get_text(&language, &key).await?;
    Ok(Json(TextLookup {
        key,
        language,
        title: content.title,
        text: content.text,
    }))
}

async fn health(State(state): State<HttpState>) -> Response {
    let Some(db) = state.db.as_ref() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
