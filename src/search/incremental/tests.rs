//! Unit tests for change queue deduplication and the worker round trip

use smallvec::SmallVec;
use std::sync::Arc;

use super::service::deduplicate;
use super::types::{ChangeMessage, ChangeOutcome, DEFAULT_BATCH_SIZE};
use super::ChangeQueue;
use crate::config::{RecordTypeProfile, SearchConfig};
use crate::search::service::SearchService;
use crate::store::{MemoryStore, Record, RecordStore, RecordTypeMeta};

fn changed(record_type: &str, identity: &str, completion_id: u64) -> ChangeMessage {
    ChangeMessage::RecordChanged {
        record_type: record_type.to_string(),
        record: Record::new(identity),
        completion_id,
    }
}

#[test]
fn test_deduplication_keeps_latest_change_per_document() {
    let mut batch = SmallVec::<[ChangeMessage; DEFAULT_BATCH_SIZE]>::new();
    batch.push(changed("Note", "N-1", 1));
    batch.push(changed("Note", "N-2", 2));
    batch.push(ChangeMessage::RecordRemoved {
        record_type: "Note".to_string(),
        identity: "N-1".to_string(),
        completion_id: 3,
    });
    batch.push(ChangeMessage::Rebuild {
        auto_discover: false,
        completion_id: 4,
    });
    batch.push(changed("Note", "N-1", 5));
    // Same identity, different type: a different document
    batch.push(changed("Page", "N-1", 6));

    let (kept, superseded) = deduplicate(&mut batch);

    assert!(batch.is_empty());
    assert_eq!(superseded, vec![1, 3]);
    let kept_ids: Vec<u64> = kept.iter().filter_map(ChangeMessage::completion_id).collect();
    assert_eq!(kept_ids, vec![2, 4, 5, 6]);
}

#[test]
fn test_deduplication_of_distinct_documents_is_identity() {
    let mut batch = SmallVec::<[ChangeMessage; DEFAULT_BATCH_SIZE]>::new();
    batch.push(changed("Note", "N-1", 1));
    batch.push(changed("Note", "N-2", 2));

    let (kept, superseded) = deduplicate(&mut batch);
    assert!(superseded.is_empty());
    assert_eq!(kept.len(), 2);
}

fn note_service() -> (SearchService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.register_type(RecordTypeMeta {
        name: "Note".to_string(),
        fields: vec!["body".to_string()],
        index_for_search: true,
        ..Default::default()
    });
    let config = SearchConfig::builder()
        .profile("Note", RecordTypeProfile::new(["body"]))
        .build()
        .unwrap();
    let service = SearchService::open(config, store.clone() as Arc<dyn RecordStore>).unwrap();
    (service, store)
}

#[tokio::test]
async fn test_queued_changes_reach_the_index() {
    let (service, _store) = note_service();
    let (queue, sender) = ChangeQueue::start(service.clone()).await;

    let outcome = sender
        .record_changed("Note", Record::new("N-1").with("body", "alpha release"))
        .await
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::Indexed);
    assert_eq!(service.stats().num_documents, 1);

    let outcome = sender
        .record_changed("Task", Record::new("T-1").with("body", "alpha"))
        .await
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::Skipped);

    let outcome = sender.record_removed("Note", "N-1").await.unwrap();
    assert_eq!(outcome, ChangeOutcome::Removed);
    assert_eq!(service.stats().num_documents, 0);

    let stats = sender.stats();
    assert_eq!(stats.total_processed, 3);
    assert_eq!(stats.pending_count, 0);

    queue.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_callback_receives_outcome() {
    let (service, _store) = note_service();
    let (queue, sender) = ChangeQueue::start(service.clone()).await;

    let (tx, rx) = tokio::sync::oneshot::channel();
    sender
        .record_changed_with(
            "Note",
            Record::new("N-1").with("body", "alpha"),
            move |outcome| {
                let _ = tx.send(outcome);
            },
        )
        .await
        .unwrap();

    let outcome = rx.await.unwrap().unwrap();
    assert_eq!(outcome, ChangeOutcome::Indexed);
    assert_eq!(queue.pending_callbacks().await, 0);
    assert_eq!(queue.pending_operations(), 0);
    assert_eq!(service.stats().num_documents, 1);

    queue.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rebuild_through_queue() {
    let (service, store) = note_service();
    store
        .put("Note", Record::new("N-1").with("body", "alpha"))
        .unwrap();
    store
        .put("Note", Record::new("N-2").with("body", "beta"))
        .unwrap();

    let (queue, sender) = ChangeQueue::start(service.clone()).await;
    let outcome = sender.rebuild(false).await.unwrap();
    assert_eq!(outcome, ChangeOutcome::Rebuilt(2));
    assert!(sender.stats().last_rebuild.is_some());

    queue.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sender_fails_after_shutdown() {
    let (service, _store) = note_service();
    let (queue, sender) = ChangeQueue::start(service).await;

    queue.shutdown().await.unwrap();

    assert!(!sender.is_healthy());
    let err = sender
        .record_changed("Note", Record::new("N-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        crate::search::errors::SearchError::QueueUnavailable(_)
    ));
}
