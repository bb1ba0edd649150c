//! Shared domain enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Kind of a stored record. Each kind owns a cache mask that scopes its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Option,
    Label,
    Text,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Option, RecordKind::Label, RecordKind::Text];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Option => "option",
            RecordKind::Label => "label",
            RecordKind::Text => "text",
        }
    }

    /// Prefix applied to a record key before it reaches the cache.
    pub fn cache_mask(self) -> &'static str {
        match self {
            RecordKind::Option => "qo_o_",
            RecordKind::Label => "qo_l_",
            RecordKind::Text => "qo_t_",
        }
    }

    /// Logical cache key for the record stored under `key`.
    pub fn cache_key(self, key: &str) -> String {
        format!("{}{key}", self.cache_mask())
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "option" | "options" => Ok(RecordKind::Option),
            "label" | "labels" => Ok(RecordKind::Label),
            "text" | "texts" => Ok(RecordKind::Text),
            other => Err(DomainError::validation(
                "kind",
                format!("unknown record kind `{other}`"),
            )),
        }
    }
}

/// Record kinds that carry a single string value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Option,
    Label,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        RecordKind::from(self).as_str()
    }

    /// Backing table for this kind.
    pub fn table(self) -> &'static str {
        match self {
            ValueKind::Option => "options",
            ValueKind::Label => "labels",
        }
    }
}

impl From<ValueKind> for RecordKind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Option => RecordKind::Option,
            ValueKind::Label => RecordKind::Label,
        }
    }
}
