//! Shared fixtures for the record-search test suite

use record_search::{
    MemoryStore, Record, RecordStore, RecordTypeMeta, RecordTypeProfile, SearchConfig,
    SearchService,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{TantivyDocument, Term};

/// Install a test subscriber once; honors `RUST_LOG`
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Note, Page, a singleton Settings type, and an infrastructure type
#[allow(dead_code)]
pub fn corpus_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store.register_type(RecordTypeMeta {
        name: "Note".to_string(),
        title_field: Some("subject".to_string()),
        searchable_fields: strings(&["subject", "body"]),
        fields: strings(&["subject", "body", "status"]),
        is_single: false,
        index_for_search: true,
    });
    store.register_type(RecordTypeMeta {
        name: "Page".to_string(),
        title_field: Some("heading".to_string()),
        searchable_fields: strings(&["heading", "text"]),
        fields: strings(&["heading", "text"]),
        is_single: false,
        index_for_search: true,
    });
    store.register_type(RecordTypeMeta {
        name: "Settings".to_string(),
        title_field: None,
        searchable_fields: strings(&["value"]),
        fields: strings(&["value"]),
        is_single: true,
        index_for_search: true,
    });
    store.register_type(RecordTypeMeta {
        name: "Activity Log".to_string(),
        title_field: None,
        searchable_fields: strings(&["message"]),
        fields: strings(&["message"]),
        is_single: false,
        index_for_search: true,
    });

    let notes = [
        ("N-1", "Alpha kickoff", "alpha release notes", "xylophone"),
        ("N-2", "Roadmap", "alpha roadmap review", "Open"),
        ("N-3", "Meeting", "quarterly alpha meeting", "Closed"),
        ("N-4", "Summary", "beta gamma summary", "Open"),
    ];
    for (identity, subject, body, status) in notes {
        store
            .put(
                "Note",
                Record::new(identity)
                    .with("subject", subject)
                    .with("body", body)
                    .with("status", status),
            )
            .unwrap();
    }

    let pages = [
        ("P-1", "Quarterly planning", "alpha budget"),
        ("P-2", "Handbook", "alpha onboarding"),
        ("P-3", "Glossary", "gamma terms"),
    ];
    for (identity, heading, text) in pages {
        store
            .put(
                "Page",
                Record::new(identity).with("heading", heading).with("text", text),
            )
            .unwrap();
    }

    store
        .put("Settings", Record::new("Settings").with("value", "alpha"))
        .unwrap();
    store
        .put("Activity Log", Record::new("L-1").with("message", "alpha logged"))
        .unwrap();

    store
}

#[allow(dead_code)]
pub fn note_profile() -> RecordTypeProfile {
    RecordTypeProfile::new(["subject", "body"])
        .with_title("subject")
        .with_extras(["status"])
}

#[allow(dead_code)]
pub fn page_profile() -> RecordTypeProfile {
    RecordTypeProfile::new(["text"]).with_title("heading")
}

/// In-memory config with Note and Page profiles
#[allow(dead_code)]
pub fn corpus_config() -> SearchConfig {
    SearchConfig::builder()
        .profile("Note", note_profile())
        .profile("Page", page_profile())
        .build()
        .unwrap()
}

/// Service over the corpus, already rebuilt
#[allow(dead_code)]
pub fn indexed_service() -> (SearchService, Arc<MemoryStore>) {
    init_tracing();
    let store = corpus_store();
    let service =
        SearchService::open(corpus_config(), store.clone() as Arc<dyn RecordStore>).unwrap();
    service.rebuild_index(false).unwrap();
    (service, store)
}

/// Every live document as `(id, title, content, doctype)`
#[allow(dead_code)]
pub fn indexed_documents(service: &SearchService) -> BTreeSet<(String, String, String, String)> {
    let engine = service.engine();
    let schema = engine.schema();
    let searcher = engine.searcher();
    let hits = searcher.search(&AllQuery, &TopDocs::with_limit(10_000)).unwrap();

    let text = |doc: &TantivyDocument, field| {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    hits.into_iter()
        .map(|(_, address)| {
            let doc: TantivyDocument = searcher.doc(address).unwrap();
            (
                text(&doc, schema.id),
                text(&doc, schema.title),
                text(&doc, schema.content),
                text(&doc, schema.doctype),
            )
        })
        .collect()
}

/// Live documents carrying document id `id`
#[allow(dead_code)]
pub fn count_documents_with_id(service: &SearchService, id: &str) -> usize {
    let engine = service.engine();
    let query = TermQuery::new(
        Term::from_field_text(engine.schema().id, id),
        IndexRecordOption::Basic,
    );
    engine.searcher().search(&query, &Count).unwrap()
}
