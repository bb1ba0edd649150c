//! Per-language lookup cache.
//!
//! Lookups are cached under `{key_prefix}{logical_key}_{language}`. Every
//! language that ever wrote an entry is kept in a [`LanguageIndex`] stored
//! under one well-known key, so a record change can drop its logical key in
//! all languages at once.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"   # or "lru"
//! lru_capacity = 10000
//! key_prefix = "qopt_"
//! languages_key = "qoptlangs"
//! ```

mod config;
mod error;
mod keys;
mod languages;
mod lru;
mod memory;
mod options;
mod store;

pub use config::{CacheBackendKind, CacheConfig};
pub use error::CacheError;
pub use keys::KeyScheme;
pub use languages::LanguageIndex;
pub use lru::LruStore;
pub use memory::MemoryStore;
pub use options::{InvalidationFailure, InvalidationResult, OptionCache};
pub use store::{KeyValueStore, StoreError};
