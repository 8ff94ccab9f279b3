//! Background worker applying queued changes
//!
//! Messages are collected into small batches. Within a batch only the last
//! change per document id is applied; earlier ones complete as superseded.
//! Changes are applied one at a time on the blocking pool, since every index
//! write holds the engine's single writer.

use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use super::sender::ChangeSender;
use super::stats::ChangeQueueStats;
use super::types::{
    ChangeMessage, ChangeOutcome, CompletionCallback, DEFAULT_BATCH_SIZE, MAX_BATCH_WAIT_MS,
};
use crate::search::errors::{SearchError, SearchResult};
use crate::search::service::SearchService;

type Batch = SmallVec<[ChangeMessage; DEFAULT_BATCH_SIZE]>;
type Callbacks = Arc<Mutex<ahash::AHashMap<u64, CompletionCallback>>>;

/// Owner of the background worker
pub struct ChangeQueue {
    sender: mpsc::UnboundedSender<ChangeMessage>,
    completion_callbacks: Callbacks,
    pending_operations: Arc<AtomicUsize>,
    is_running: Arc<AtomicBool>,
    stats: Arc<ChangeQueueStats>,
    worker: JoinHandle<()>,
}

impl ChangeQueue {
    /// Spawn the worker on the current runtime
    pub async fn start(service: SearchService) -> (ChangeQueue, ChangeSender) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let completion_callbacks: Callbacks =
            Arc::new(Mutex::new(ahash::AHashMap::with_capacity(256)));
        let next_completion_id = Arc::new(AtomicU64::new(1));
        let pending_operations = Arc::new(AtomicUsize::new(0));
        let is_running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(ChangeQueueStats::new());

        let worker = tokio::spawn(Self::worker_loop(
            service,
            receiver,
            completion_callbacks.clone(),
            pending_operations.clone(),
            is_running.clone(),
            stats.clone(),
        ));

        let change_sender = ChangeSender {
            sender: sender.clone(),
            completion_callbacks: completion_callbacks.clone(),
            next_completion_id,
            pending_operations: pending_operations.clone(),
            stats: stats.clone(),
        };

        let queue = ChangeQueue {
            sender,
            completion_callbacks,
            pending_operations,
            is_running,
            stats,
            worker,
        };

        (queue, change_sender)
    }

    async fn worker_loop(
        service: SearchService,
        mut receiver: mpsc::UnboundedReceiver<ChangeMessage>,
        completion_callbacks: Callbacks,
        pending_operations: Arc<AtomicUsize>,
        is_running: Arc<AtomicBool>,
        stats: Arc<ChangeQueueStats>,
    ) {
        let batch_timeout = Duration::from_millis(MAX_BATCH_WAIT_MS);
        let mut batch = Batch::new();
        let mut batch_started = Instant::now();

        tracing::debug!("Change queue worker started");

        loop {
            let next = if batch.is_empty() {
                receiver.recv().await
            } else {
                let remaining = batch_timeout.saturating_sub(batch_started.elapsed());
                match tokio::time::timeout(remaining, receiver.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        Self::process_batch(
                            &service,
                            &mut batch,
                            &completion_callbacks,
                            &pending_operations,
                            &stats,
                        )
                        .await;
                        continue;
                    }
                }
            };

            match next {
                Some(ChangeMessage::Shutdown) | None => break,
                Some(message) => {
                    if batch.is_empty() {
                        batch_started = Instant::now();
                    }
                    batch.push(message);
                    if batch.len() >= DEFAULT_BATCH_SIZE {
                        Self::process_batch(
                            &service,
                            &mut batch,
                            &completion_callbacks,
                            &pending_operations,
                            &stats,
                        )
                        .await;
                    }
                }
            }
        }

        Self::process_batch(
            &service,
            &mut batch,
            &completion_callbacks,
            &pending_operations,
            &stats,
        )
        .await;

        is_running.store(false, Ordering::Relaxed);

        // Anything sent after the shutdown request is refused
        receiver.close();
        while let Ok(message) = receiver.try_recv() {
            if let Some(completion_id) = message.completion_id() {
                Self::complete_operation(
                    completion_id,
                    Err(SearchError::QueueUnavailable(
                        "change queue shut down".to_string(),
                    )),
                    &completion_callbacks,
                    &pending_operations,
                    &stats,
                )
                .await;
            }
        }
        completion_callbacks.lock().await.clear();

        tracing::debug!("Change queue worker stopped");
    }

    /// Apply one batch, last change per document wins
    async fn process_batch(
        service: &SearchService,
        batch: &mut Batch,
        completion_callbacks: &Callbacks,
        pending_operations: &Arc<AtomicUsize>,
        stats: &Arc<ChangeQueueStats>,
    ) {
        if batch.is_empty() {
            return;
        }

        let (kept, superseded) = deduplicate(batch);

        for completion_id in superseded {
            stats.record_superseded();
            Self::complete_operation(
                completion_id,
                Ok(ChangeOutcome::Superseded),
                completion_callbacks,
                pending_operations,
                stats,
            )
            .await;
        }

        for message in kept {
            let completion_id = message.completion_id();
            let is_rebuild = matches!(message, ChangeMessage::Rebuild { .. });

            let worker_service = service.clone();
            let result = tokio::task::spawn_blocking(move || apply(&worker_service, message))
                .await
                .unwrap_or_else(|e| {
                    Err(SearchError::QueueUnavailable(format!(
                        "change task failed: {e}"
                    )))
                });

            match &result {
                Ok(outcome) => {
                    stats.record_applied(is_rebuild);
                    tracing::trace!(?outcome, "Queued change applied");
                }
                Err(e) => {
                    stats.record_failed();
                    tracing::warn!(error = %e, "Queued change failed");
                }
            }

            if let Some(id) = completion_id {
                Self::complete_operation(
                    id,
                    result,
                    completion_callbacks,
                    pending_operations,
                    stats,
                )
                .await;
            }
        }

        stats.record_batch();
    }

    async fn complete_operation(
        completion_id: u64,
        result: SearchResult<ChangeOutcome>,
        completion_callbacks: &Callbacks,
        pending_operations: &Arc<AtomicUsize>,
        stats: &Arc<ChangeQueueStats>,
    ) {
        let callback = completion_callbacks.lock().await.remove(&completion_id);
        if let Some(callback) = callback {
            // Settle first: the callback may wake a caller that reads stats
            pending_operations.fetch_sub(1, Ordering::Relaxed);
            stats.settled();
            callback(result);
        }
    }

    /// Check if the worker is still accepting changes
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Changes queued but not yet completed
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.pending_operations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<ChangeQueueStats> {
        Arc::clone(&self.stats)
    }

    /// Get count of pending completion callbacks
    pub async fn pending_callbacks(&self) -> usize {
        self.completion_callbacks.lock().await.len()
    }

    /// Apply what is already queued, then stop the worker and wait for it
    pub async fn shutdown(self) -> SearchResult<()> {
        // Already stopped if the send fails; still join below
        let _ = self.sender.send(ChangeMessage::Shutdown);
        self.worker
            .await
            .map_err(|e| SearchError::QueueUnavailable(format!("worker task failed: {e}")))
    }
}

/// Split a batch into the changes to apply, in arrival order, and the
/// completion ids of changes a later message to the same document replaces
pub(super) fn deduplicate(batch: &mut Batch) -> (Batch, Vec<u64>) {
    let mut last_index: ahash::AHashMap<String, usize> =
        ahash::AHashMap::with_capacity(batch.len());
    for (idx, message) in batch.iter().enumerate() {
        if let Some(document_id) = message.document_id() {
            last_index.insert(document_id, idx);
        }
    }

    let mut superseded = Vec::new();
    let kept = batch
        .drain(..)
        .enumerate()
        .filter_map(|(idx, message)| match message.document_id() {
            Some(document_id) if last_index.get(&document_id) != Some(&idx) => {
                superseded.extend(message.completion_id());
                None
            }
            _ => Some(message),
        })
        .collect();

    (kept, superseded)
}

fn apply(service: &SearchService, message: ChangeMessage) -> SearchResult<ChangeOutcome> {
    match message {
        ChangeMessage::RecordChanged {
            record_type,
            record,
            ..
        } => service
            .notify_record_changed(&record_type, &record)
            .map(|indexed| {
                if indexed {
                    ChangeOutcome::Indexed
                } else {
                    ChangeOutcome::Skipped
                }
            }),
        ChangeMessage::RecordRemoved {
            record_type,
            identity,
            ..
        } => service
            .remove_record(&record_type, &identity)
            .map(|()| ChangeOutcome::Removed),
        ChangeMessage::Rebuild { auto_discover, .. } => service
            .rebuild_index(auto_discover)
            .map(ChangeOutcome::Rebuilt),
        // Handled by the worker loop, never batched
        ChangeMessage::Shutdown => Ok(ChangeOutcome::Skipped),
    }
}
