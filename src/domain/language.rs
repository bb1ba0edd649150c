//! Language codes used to qualify cached lookups.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::DomainError;

const MAX_LANGUAGE_LEN: usize = 35;

/// Normalized locale code such as `en` or `pt-br`.
///
/// Codes are trimmed, lower-cased and `_` becomes `-` on construction, so
/// `en-US`, `en_us` and `en-us` address the same cache entries. Only ASCII
/// alphanumerics and `-` remain: the code ends every cache key after a `_`
/// separator and must never contain one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(code: &str) -> Result<Self, DomainError> {
        let normalized = code.trim().to_ascii_lowercase().replace('_', "-");
        let valid = !normalized.is_empty()
            && normalized.len() <= MAX_LANGUAGE_LEN
            && normalized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');

        if !valid {
            return Err(DomainError::InvalidLanguage(code.to_string()));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Subtag before the first `-`, e.g. `pt` for `pt-br`.
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Language::new(value)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Language::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Languages a deployment serves; the default is always a member.
///
/// Requests may only select a served language, which keeps the cache's
/// language index bounded by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLanguages {
    default: Language,
    all: Arc<BTreeSet<Language>>,
}

impl SupportedLanguages {
    pub fn new(default: Language, languages: impl IntoIterator<Item = Language>) -> Self {
        let mut all: BTreeSet<Language> = languages.into_iter().collect();
        all.insert(default.clone());
        Self {
            default,
            all: Arc::new(all),
        }
    }

    pub fn default_language(&self) -> &Language {
        &self.default
    }

    pub fn contains(&self, language: &Language) -> bool {
        self.all.contains(language)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.all.iter()
    }

    /// Accept `code` only when it names a served language.
    pub fn select(&self, code: &str) -> Result<Language, DomainError> {
        let language = Language::new(code)?;
        if self.contains(&language) {
            Ok(language)
        } else {
            Err(DomainError::UnsupportedLanguage(language.to_string()))
        }
    }

    /// Served language for a client-preferred tag: the tag itself, else a
    /// served language equal to its primary subtag (`de-ch` falls back to `de`).
    pub fn negotiate(&self, wanted: &Language) -> Option<Language> {
        if self.contains(wanted) {
            return Some(wanted.clone());
        }
        Language::new(wanted.primary())
            .ok()
            .filter(|primary| self.contains(primary))
    }
}
