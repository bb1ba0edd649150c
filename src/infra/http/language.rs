//! Per-request language resolution.
//!
//! Order: `?lang=`, then the best served `Accept-Language` tag, then the
//! configured default. Only configured languages are ever selected.

use axum::extract::{FromRef, FromRequestParts, Query};
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;
use serde::Deserialize;

use crate::domain::language::{Language, SupportedLanguages};

use super::error::ApiError;
use super::state::HttpState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLanguage(pub Language);

#[derive(Debug, Deserialize)]
struct LanguageQuery {
    lang: Option<String>,
}

impl<S> FromRequestParts<S> for RequestLanguage
where
    S: Send + Sync,
    HttpState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let supported = HttpState::from_ref(state).languages;

        // A malformed query string is not a language error; other extractors report it.
        let explicit = Query::<LanguageQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.lang)
            .filter(|code| !code.trim().is_empty());
        if let Some(code) = explicit {
            return supported
                .select(&code)
                .map(RequestLanguage)
                .map_err(ApiError::from);
        }

        let header = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        if let Some(language) = header.and_then(|value| preferred_language(value, &supported)) {
            return Ok(RequestLanguage(language));
        }

        Ok(RequestLanguage(supported.default_language().clone()))
    }
}

/// Highest-weighted tag of an `Accept-Language` header that `supported`
/// serves, directly or through its primary subtag.
///
/// Ties keep header order. `*` and zero-weighted tags are skipped.
pub fn preferred_language(header: &str, supported: &SupportedLanguages) -> Option<Language> {
    let mut candidates: Vec<(f32, &str)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            let weight = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .map(|q| q.trim().parse::<f32>().unwrap_or(0.0))
                .unwrap_or(1.0);
            (!tag.is_empty() && tag != "*" && weight > 0.0).then_some((weight, tag))
        })
        .collect();

    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    candidates
        .into_iter()
        .filter_map(|(_, tag)| Language::new(tag).ok())
        .find_map(|language| supported.negotiate(&language))
}
