use std::collections::{BTreeSet, HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use qoptions::cache::{
    InvalidationFailure, InvalidationResult, KeyValueStore, LruStore, MemoryStore, OptionCache,
    StoreError,
};
use qoptions::domain::language::Language;
use serde_json::{Value, json};

fn lang(code: &str) -> Language {
    Language::new(code).expect("valid language code")
}

fn memory_cache() -> (OptionCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = OptionCache::new(store.clone(), "qopt_", "qoptlangs");
    (cache, store)
}

/// Store that refuses to delete the keys it was told to fail on.
#[derive(Default)]
struct FlakyStore {
    entries: Mutex<HashMap<String, Value>>,
    failing_deletes: HashSet<String>,
}

impl FlakyStore {
    fn failing_on(keys: &[&str]) -> Self {
        Self {
            entries: Mutex::default(),
            failing_deletes: keys.iter().map(|key| key.to_string()).collect(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.failing_deletes.contains(key) {
            return Err(StoreError::backend(format!("connection reset deleting {key}")));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn set_then_get_returns_value_for_same_language() {
    let (cache, _) = memory_cache();

    cache
        .set(&lang("en"), "qo_o_site_title", "Acme")
        .await
        .expect("set succeeds");

    let cached: Option<String> = cache.get(&lang("en"), "qo_o_site_title").await.unwrap();
    assert_eq!(cached.as_deref(), Some("Acme"));
}

#[tokio::test]
async fn languages_do_not_share_entries() {
    let (cache, _) = memory_cache();

    cache.set(&lang("en"), "qo_o_site_title", "Acme").await.unwrap();

    let german: Option<String> = cache.get(&lang("de"), "qo_o_site_title").await.unwrap();
    assert_eq!(german, None);

    cache.set(&lang("de"), "qo_o_site_title", "Acme GmbH").await.unwrap();
    let english: Option<String> = cache.get(&lang("en"), "qo_o_site_title").await.unwrap();
    assert_eq!(english.as_deref(), Some("Acme"));
}

#[tokio::test]
async fn every_written_language_is_indexed() {
    let (cache, store) = memory_cache();

    for code in ["en", "de", "fr"] {
        cache.set(&lang(code), "qo_l_menu", "Menu").await.unwrap();
    }
    cache.set(&lang("en"), "qo_l_footer", "Footer").await.unwrap();

    let languages = cache.index().all().await.unwrap();
    assert_eq!(
        languages,
        BTreeSet::from([lang("de"), lang("en"), lang("fr")])
    );
    assert_eq!(
        store.get("qoptlangs").await.unwrap(),
        Some(json!(["de", "en", "fr"]))
    );
}

#[tokio::test]
async fn delete_all_languages_clears_every_language() {
    let (cache, store) = memory_cache();
    cache.set(&lang("en"), "qo_o_site_title", "Acme").await.unwrap();
    cache.set(&lang("de"), "qo_o_site_title", "Acme GmbH").await.unwrap();
    cache.set(&lang("en"), "qo_o_tagline", "We build").await.unwrap();

    let result = cache.delete_all_languages("qo_o_site_title").await;

    assert!(result.is_complete());
    assert_eq!(result.invalidated(), &[lang("de"), lang("en")]);
    for code in ["en", "de"] {
        let cached: Option<String> = cache.get(&lang(code), "qo_o_site_title").await.unwrap();
        assert_eq!(cached, None, "stale entry left for {code}");
    }

    // Other keys and the index itself are untouched.
    let tagline: Option<String> = cache.get(&lang("en"), "qo_o_tagline").await.unwrap();
    assert_eq!(tagline.as_deref(), Some("We build"));
    assert_eq!(store.get("qoptlangs").await.unwrap(), Some(json!(["de", "en"])));
}

#[tokio::test]
async fn invalidating_unknown_key_is_harmless() {
    let (cache, _) = memory_cache();
    cache.set(&lang("en"), "qo_o_site_title", "Acme").await.unwrap();

    let result = cache.delete_all_languages("qo_o_never_cached").await;

    assert_eq!(
        result,
        InvalidationResult::Complete {
            invalidated: vec![lang("en")]
        }
    );
    let cached: Option<String> = cache.get(&lang("en"), "qo_o_site_title").await.unwrap();
    assert_eq!(cached.as_deref(), Some("Acme"));
}

#[tokio::test]
async fn record_is_idempotent() {
    let (cache, store) = memory_cache();

    cache.index().record(&lang("en")).await.unwrap();
    cache.index().record(&lang("en")).await.unwrap();

    assert_eq!(store.get("qoptlangs").await.unwrap(), Some(json!(["en"])));
}

#[tokio::test]
async fn absent_index_makes_invalidation_a_no_op() {
    let (cache, store) = memory_cache();
    store
        .set("qopt_qo_o_site_title_en", json!("orphan"))
        .await
        .unwrap();

    let result = cache.delete_all_languages("qo_o_site_title").await;

    assert_eq!(result.invalidated(), &[] as &[Language]);
    assert!(result.is_complete());
    // Without an index the orphan cannot be found.
    assert_eq!(
        store.get("qopt_qo_o_site_title_en").await.unwrap(),
        Some(json!("orphan"))
    );
}

#[tokio::test]
async fn corrupt_index_is_reported_and_repaired_by_next_write() {
    let (cache, store) = memory_cache();
    store.set("qoptlangs", json!({"en": true})).await.unwrap();

    assert!(cache.index().all().await.is_err());
    let result = cache.delete_all_languages("qo_o_site_title").await;
    assert!(matches!(
        result.failures(),
        [InvalidationFailure::IndexUnreadable { .. }]
    ));

    cache.set(&lang("fr"), "qo_o_site_title", "Acme SA").await.unwrap();
    assert_eq!(
        cache.index().all().await.unwrap(),
        BTreeSet::from([lang("fr")])
    );
}

#[tokio::test]
async fn site_title_scenario() {
    let (cache, store) = memory_cache();
    let en = lang("en");

    // First render caches the looked-up value.
    cache.set(&en, "qo_o_site_title", "Acme").await.unwrap();
    assert_eq!(
        store.get("qopt_qo_o_site_title_en").await.unwrap(),
        Some(json!("Acme"))
    );

    // The record changes: every language is dropped.
    let result = cache.delete_all_languages("qo_o_site_title").await;
    assert!(result.is_complete());
    assert_eq!(store.get("qopt_qo_o_site_title_en").await.unwrap(), None);

    // Next render misses and refills with the new value.
    let cached: Option<String> = cache.get(&en, "qo_o_site_title").await.unwrap();
    assert_eq!(cached, None);
    cache.set(&en, "qo_o_site_title", "Acme Corp").await.unwrap();
    let cached: Option<String> = cache.get(&en, "qo_o_site_title").await.unwrap();
    assert_eq!(cached.as_deref(), Some("Acme Corp"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_of_one_language_store_it_once() {
    let (cache, store) = memory_cache();
    let cache = Arc::new(cache);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.index().record(&lang("fr")).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("task joined").expect("record succeeds");
    }

    assert_eq!(store.get("qoptlangs").await.unwrap(), Some(json!(["fr"])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_of_different_languages_keep_all() {
    let (cache, _) = memory_cache();
    let cache = Arc::new(cache);
    let codes = ["en", "de", "fr", "it", "es", "pt", "nl", "pl"];

    let tasks: Vec<_> = codes
        .iter()
        .map(|code| {
            let cache = cache.clone();
            let language = lang(code);
            tokio::spawn(async move { cache.set(&language, "qo_l_menu", "Menu").await })
        })
        .collect();
    for task in tasks {
        task.await.expect("task joined").expect("set succeeds");
    }

    let indexed = cache.index().all().await.unwrap();
    let expected: BTreeSet<Language> = codes.iter().map(|code| lang(code)).collect();
    assert_eq!(indexed, expected);
}

#[tokio::test]
async fn failed_deletes_yield_partial_failure() {
    let store = Arc::new(FlakyStore::failing_on(&["qopt_qo_t_about_de"]));
    let cache = OptionCache::new(store.clone(), "qopt_", "qoptlangs");
    for code in ["en", "de", "fr"] {
        cache.set(&lang(code), "qo_t_about", "About").await.unwrap();
    }

    let result = cache.delete_all_languages("qo_t_about").await;

    assert!(!result.is_complete());
    assert_eq!(result.invalidated(), &[lang("en"), lang("fr")]);
    match result.failures() {
        [InvalidationFailure::Delete { language, detail }] => {
            assert_eq!(language, &lang("de"));
            assert!(detail.contains("connection reset"));
        }
        other => panic!("unexpected failures: {other:?}"),
    }
    assert!(!store.contains("qopt_qo_t_about_en"));
    assert!(store.contains("qopt_qo_t_about_de"));
    assert!(!store.contains("qopt_qo_t_about_fr"));
}

#[tokio::test]
async fn partial_failure_serializes_with_reasons() {
    let store = Arc::new(FlakyStore::failing_on(&["qopt_qo_l_menu_en"]));
    let cache = OptionCache::new(store, "qopt_", "qoptlangs");
    cache.set(&lang("en"), "qo_l_menu", "Menu").await.unwrap();

    let result = cache.delete_all_languages("qo_l_menu").await;
    let encoded = serde_json::to_value(&result).unwrap();

    assert_eq!(encoded["outcome"], "partial_failure");
    assert_eq!(encoded["invalidated"], json!([]));
    assert_eq!(encoded["failures"][0]["reason"], "delete");
    assert_eq!(encoded["failures"][0]["language"], "en");
}

#[tokio::test]
async fn lru_backend_evicts_entries_but_keeps_the_index() {
    let store = Arc::new(LruStore::new(NonZeroUsize::new(2).unwrap()));
    let cache = OptionCache::new(store.clone(), "qopt_", "qoptlangs");
    let en = lang("en");

    cache.set(&en, "qo_o_a", "1").await.unwrap();
    cache.set(&en, "qo_o_b", "2").await.unwrap();
    cache.set(&en, "qo_o_c", "3").await.unwrap();

    let oldest: Option<String> = cache.get(&en, "qo_o_a").await.unwrap();
    assert_eq!(oldest, None);
    let newest: Option<String> = cache.get(&en, "qo_o_c").await.unwrap();
    assert_eq!(newest.as_deref(), Some("3"));
    assert_eq!(cache.index().all().await.unwrap(), BTreeSet::from([en]));
}

#[tokio::test]
async fn lru_backend_invalidates_all_languages() {
    let store = Arc::new(LruStore::new(NonZeroUsize::new(16).unwrap()));
    let cache = OptionCache::new(store, "qopt_", "qoptlangs");
    cache.set(&lang("en"), "qo_l_menu", "Menu").await.unwrap();
    cache.set(&lang("de"), "qo_l_menu", "Menü").await.unwrap();

    let result = cache.delete_all_languages("qo_l_menu").await;

    assert!(result.is_complete());
    for code in ["en", "de"] {
        let cached: Option<String> = cache.get(&lang(code), "qo_l_menu").await.unwrap();
        assert_eq!(cached, None);
    }
}
