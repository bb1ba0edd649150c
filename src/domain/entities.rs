//! Domain entities mirrored from persistent storage.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;
use super::types::{RecordKind, ValueKind};

pub const MAX_KEY_LEN: usize = 50;
pub const MAX_VALUE_LEN: usize = 256;
pub const MAX_TITLE_LEN: usize = 256;

/// An option or a label: a unique key holding one short string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRecord {
    pub id: Uuid,
    pub kind: ValueKind,
    pub key: String,
    pub value: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ValueRecord {
    pub fn cache_key(&self) -> String {
        RecordKind::from(self.kind).cache_key(&self.key)
    }
}

/// A rich text block with a title and editor-only notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRecord {
    pub id: Uuid,
    pub key: String,
    pub title: String,
    pub text: String,
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TextRecord {
    pub fn cache_key(&self) -> String {
        RecordKind::Text.cache_key(&self.key)
    }

    /// Editor notes with every tag removed, for list displays.
    pub fn notes_without_tags(&self) -> String {
        let mut builder = ammonia::Builder::empty();
        builder.clean_content_tags(HashSet::from(["script", "style"]));
        builder.clean(&self.notes).to_string()
    }

    pub fn content(&self) -> TextContent {
        TextContent {
            title: self.title.clone(),
            text: self.text.clone(),
        }
    }
}

/// The cached projection of a text: what templates render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub title: String,
    pub text: String,
}

/// Validate a record key: non-empty, bounded, and free of whitespace.
pub fn validate_key(key: &str) -> Result<(), DomainError> {
    if key.trim().is_empty() {
        return Err(DomainError::validation("key", "must not be empty"));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(DomainError::validation(
            "key",
            format!("must be at most {MAX_KEY_LEN} characters"),
        ));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("key", "must not contain whitespace"));
    }
    Ok(())
}

pub fn validate_max_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), DomainError> {
    if value.chars().count() > max {
        return Err(DomainError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(notes: &str) -> TextRecord {
        TextRecord {
            id: Uuid::new_v4(),
            key: "about".to_string(),
            title: "About us".to_string(),
            text: "<p>We build things.</p>".to_string(),
            notes: notes.to_string(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn notes_without_tags_keeps_only_text() {
        let text = sample_text("<p>Shown on the <b>about</b> page</p>");
        assert_eq!(text.notes_without_tags(), "Shown on the about page");
    }

    #[test]
    fn notes_without_tags_drops_scripts() {
        let text = sample_text("visible<script>alert(1)</script>");
        assert_eq!(text.notes_without_tags(), "visible");
    }

    #[test]
    fn record_cache_keys_use_kind_mask() {
        let option = ValueRecord {
            id: Uuid::nil(),
            kind: ValueKind::Option,
            key: "site_title".to_string(),
            value: "Acme".to_string(),
            updated_at: OffsetDateTime::now_utc(),
        };
        assert_eq!(option.cache_key(), "qo_o_site_title");
        assert_eq!(sample_text("").cache_key(), "qo_t_about");
    }

    #[test]
    fn key_validation() {
        assert!(validate_key("site_title").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("  ").is_err());
        assert!(validate_key("site title").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN)).is_ok());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn length_validation_counts_characters() {
        assert!(validate_max_len("value", &"é".repeat(MAX_VALUE_LEN), MAX_VALUE_LEN).is_ok());
        assert!(validate_max_len("value", &"é".repeat(MAX_VALUE_LEN + 1), MAX_VALUE_LEN).is_err());
    }
}
