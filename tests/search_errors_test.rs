use record_search::config::ConfigError;
use record_search::search::errors::*;
use record_search::{SearchConfig, SearchEngine};
use tantivy::schema::{STORED, STRING, Schema};
use tantivy::{Index, doc};
use tempfile::TempDir;

#[test]
fn test_error_classification() {
    let unavailable = SearchError::IndexUnavailable {
        path: "/tmp/index".to_string(),
        message: "missing".to_string(),
    };
    assert!(unavailable.is_fatal());
    assert!(!unavailable.needs_index_rebuild());

    let write = SearchError::Write {
        target: "Note-N-1".to_string(),
        message: "commit failed".to_string(),
    };
    assert!(!write.is_fatal());
    assert!(write.needs_index_rebuild());

    let parse = SearchError::QueryParse {
        query: "title:".to_string(),
        message: "syntax".to_string(),
    };
    assert!(!parse.is_fatal());
    assert!(!parse.needs_index_rebuild());
}

#[test]
fn test_config_error_converts_to_configuration() {
    let error: SearchError = ConfigError::Setting {
        setting: "token_hit_limit",
        details: "must be at least 1".to_string(),
    }
    .into();
    assert!(matches!(error, SearchError::Configuration(_)));
    assert!(error.to_string().contains("token_hit_limit"));
}

#[test]
fn test_error_messages_name_their_subject() {
    let error = SearchError::QueryParse {
        query: "nosuchfield:x".to_string(),
        message: "field does not exist".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Invalid search query 'nosuchfield:x': field does not exist"
    );
}

#[test]
fn test_missing_index_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = SearchEngine::open_existing(&dir.path().join("absent"), &SearchConfig::default())
        .unwrap_err();
    assert!(matches!(err, SearchError::IndexUnavailable { .. }));
}

#[test]
fn test_incompatible_index_is_recreated_on_open() {
    let dir = TempDir::new().unwrap();
    {
        let mut builder = Schema::builder();
        let url = builder.add_text_field("url", STRING | STORED);
        let index = Index::create_in_dir(dir.path(), builder.build()).unwrap();
        let mut writer = index.writer_with_num_threads(1, 15_000_000).unwrap();
        writer.add_document(doc!(url => "https://example.com")).unwrap();
        writer.commit().unwrap();
    }

    let err = SearchEngine::open_existing(dir.path(), &SearchConfig::default()).unwrap_err();
    assert!(err.is_fatal());

    let config = SearchConfig::builder().index_dir(dir.path()).build().unwrap();
    let engine = SearchEngine::open(&config).unwrap();
    assert_eq!(engine.stats().num_documents, 0);
    assert!(engine.schema().is_compatible_with(&engine.index().schema()));
}
