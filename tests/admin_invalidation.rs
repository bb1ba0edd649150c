use std::collections::BTreeSet;
use std::sync::Arc;

use qoptions::application::lookup::{LookupError, LookupService};
use qoptions::application::records::{
    AdminRecordError, AdminRecordService, SaveTextCommand, SaveValueCommand,
};
use qoptions::application::repos::ValueRecordsRepo;
use qoptions::cache::{MemoryStore, OptionCache};
use qoptions::domain::error::DomainError;
use qoptions::domain::language::Language;
use qoptions::domain::types::{RecordKind, ValueKind};
use qoptions::infra::memory::MemoryRepositories;

struct Harness {
    lookup: LookupService,
    records: AdminRecordService,
    cache: Arc<OptionCache>,
}

fn lang(code: &str) -> Language {
    Language::new(code).expect("valid language code")
}

fn harness() -> Harness {
    let repos = Arc::new(MemoryRepositories::new());
    let cache = Arc::new(OptionCache::new(
        Arc::new(MemoryStore::new()),
        "qopt_",
        "qoptlangs",
    ));
    Harness {
        lookup: LookupService::new(repos.clone(), repos.clone()).with_cache_opt(Some(cache.clone())),
        records: AdminRecordService::new(repos.clone(), repos).with_cache_opt(Some(cache.clone())),
        cache,
    }
}

fn value(key: &str, value: &str) -> SaveValueCommand {
    SaveValueCommand {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn text(key: &str, title: &str, body: &str) -> SaveTextCommand {
    SaveTextCommand {
        key: key.to_string(),
        title: title.to_string(),
        text: body.to_string(),
        notes: String::new(),
    }
}

#[tokio::test]
async fn saving_an_option_refreshes_every_language() {
    let h = harness();
    h.records.save_option(value("site_title", "Acme")).await.unwrap();

    for code in ["en", "de", "fr"] {
        assert_eq!(h.lookup.get_option(&lang(code), "site_title").await.unwrap(), "Acme");
    }

    let write = h
        .records
        .save_option(value("site_title", "Acme Corp"))
        .await
        .unwrap();

    let invalidation = write.invalidation.expect("cache is enabled");
    assert!(invalidation.is_complete());
    assert_eq!(
        invalidation.invalidated(),
        &[lang("de"), lang("en"), lang("fr")]
    );
    for code in ["en", "de", "fr"] {
        assert_eq!(
            h.lookup.get_option(&lang(code), "site_title").await.unwrap(),
            "Acme Corp",
            "stale option served for {code}"
        );
    }
}

#[tokio::test]
async fn lookups_are_served_from_cache_until_invalidated() {
    let h = harness();
    h.records.save_label(value("menu", "Menu")).await.unwrap();
    assert_eq!(h.lookup.get_label(&lang("en"), "menu").await.unwrap(), "Menu");

    // Overwrite the cached entry directly: the lookup must not touch the record store.
    h.cache
        .set(&lang("en"), &RecordKind::Label.cache_key("menu"), "Cached menu")
        .await
        .unwrap();
    assert_eq!(
        h.lookup.get_label(&lang("en"), "menu").await.unwrap(),
        "Cached menu"
    );

    h.records
        .invalidate(RecordKind::Label, "menu")
        .await
        .expect("cache is enabled");
    assert_eq!(h.lookup.get_label(&lang("en"), "menu").await.unwrap(), "Menu");
}

#[tokio::test]
async fn options_and_labels_with_one_key_are_cached_apart() {
    let h = harness();
    h.records.save_option(value("contact", "info@acme.test")).await.unwrap();
    h.records.save_label(value("contact", "Contact us")).await.unwrap();

    let en = lang("en");
    assert_eq!(h.lookup.get_option(&en, "contact").await.unwrap(), "info@acme.test");
    assert_eq!(h.lookup.get_label(&en, "contact").await.unwrap(), "Contact us");

    h.records.save_label(value("contact", "Get in touch")).await.unwrap();
    assert_eq!(h.lookup.get_option(&en, "contact").await.unwrap(), "info@acme.test");
    assert_eq!(h.lookup.get_label(&en, "contact").await.unwrap(), "Get in touch");
}

#[tokio::test]
async fn saving_a_text_refreshes_title_and_body() {
    let h = harness();
    h.records
        .save_text(text("about", "About", "<p>Old</p>"))
        .await
        .unwrap();
    let before = h.lookup.get_text(&lang("de"), "about").await.unwrap();
    assert_eq!(before.title, "About");

    let write = h
        .records
        .save_text(text("about", "About us", "<p>New</p>"))
        .await
        .unwrap();
    assert_eq!(write.record.title, "About us");
    assert!(write.invalidation.is_some_and(|result| result.is_complete()));

    let after = h.lookup.get_text(&lang("de"), "about").await.unwrap();
    assert_eq!(after.title, "About us");
    assert_eq!(after.text, "<p>New</p>");
}

#[tokio::test]
async fn deleting_invalidates_and_reports_missing_rows() {
    let h = harness();
    h.records.save_option(value("tagline", "We build")).await.unwrap();
    assert_eq!(h.lookup.get_option(&lang("en"), "tagline").await.unwrap(), "We build");

    let deletion = h.records.delete_option("tagline").await.unwrap();
    assert!(deletion.deleted);
    assert_eq!(deletion.kind, RecordKind::Option);
    assert!(deletion.invalidation.is_some());
    assert!(matches!(
        h.lookup.get_option(&lang("en"), "tagline").await,
        Err(LookupError::NotFound { .. })
    ));

    let again = h.records.delete_option("tagline").await.unwrap();
    assert!(!again.deleted);
    // Stale entries are still dropped when the row is already gone.
    assert!(again.invalidation.is_some());
}

#[tokio::test]
async fn missing_records_are_created_blank_when_enabled() {
    let repos = Arc::new(MemoryRepositories::new());
    let lookup = LookupService::new(repos.clone(), repos.clone()).with_create_missing_items(true);
    let records = AdminRecordService::new(repos.clone(), repos);

    assert_eq!(lookup.get_option(&lang("en"), "new_option").await.unwrap(), "");
    assert_eq!(lookup.get_label(&lang("en"), "new_label").await.unwrap(), "");
    let content = lookup.get_text(&lang("en"), "new_text").await.unwrap();
    assert_eq!(content.title, "");
    assert_eq!(content.text, "");

    let option = records
        .find_value(ValueKind::Option, "new_option")
        .await
        .unwrap()
        .expect("blank option created");
    assert_eq!(option.value, "");
    assert!(records.find_text("new_text").await.unwrap().is_some());
}

#[tokio::test]
async fn missing_records_are_reported_when_creation_is_off() {
    let repos = Arc::new(MemoryRepositories::new());
    let lookup = LookupService::new(repos.clone(), repos.clone());

    let err = lookup.get_label(&lang("en"), "absent").await.unwrap_err();
    assert!(matches!(
        err,
        LookupError::NotFound {
            kind: RecordKind::Label,
            ..
        }
    ));
    assert!(repos.find_value(ValueKind::Label, "absent").await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_keys_are_not_created() {
    let repos = Arc::new(MemoryRepositories::new());
    let lookup = LookupService::new(repos.clone(), repos.clone()).with_create_missing_items(true);

    let err = lookup.get_option(&lang("en"), "has space").await.unwrap_err();
    assert!(matches!(err, LookupError::Domain(DomainError::Validation { .. })));
    assert!(repos.list_values(ValueKind::Option).await.unwrap().is_empty());
}

#[tokio::test]
async fn saves_validate_key_and_lengths() {
    let h = harness();

    let err = h.records.save_option(value("", "x")).await.unwrap_err();
    assert!(matches!(err, AdminRecordError::Domain(DomainError::Validation { .. })));

    let err = h
        .records
        .save_label(value("long_value", &"v".repeat(257)))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminRecordError::Domain(DomainError::Validation { .. })));

    let err = h
        .records
        .save_text(text(&"k".repeat(51), "Title", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminRecordError::Domain(DomainError::Validation { .. })));

    assert!(h.records.list_values(ValueKind::Option).await.unwrap().is_empty());
}

#[tokio::test]
async fn cached_languages_follow_lookups() {
    let h = harness();
    h.records.save_option(value("site_title", "Acme")).await.unwrap();
    assert_eq!(h.records.cached_languages().await.unwrap(), Some(BTreeSet::new()));

    h.lookup.get_option(&lang("pt-BR"), "site_title").await.unwrap();
    h.lookup.get_option(&lang("en"), "site_title").await.unwrap();

    assert_eq!(
        h.records.cached_languages().await.unwrap(),
        Some(BTreeSet::from([lang("en"), lang("pt-br")]))
    );
}

#[tokio::test]
async fn disabled_cache_reports_no_invalidation() {
    let repos = Arc::new(MemoryRepositories::new());
    let records = AdminRecordService::new(repos.clone(), repos);

    let write = records.save_option(value("site_title", "Acme")).await.unwrap();
    assert!(write.invalidation.is_none());
    assert!(records.invalidate(RecordKind::Option, "site_title").await.is_none());
    assert_eq!(records.cached_languages().await.unwrap(), None);
}
