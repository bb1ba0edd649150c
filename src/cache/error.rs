use thiserror::Error;

use super::store::StoreError;

/// Errors raised by the option cache and language index.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("language index `{key}` is unreadable: {reason}")]
    IndexCorrupt { key: String, reason: String },
    #[error("failed to encode cache entry `{key}`")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cache entry `{key}` does not match the requested type")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
