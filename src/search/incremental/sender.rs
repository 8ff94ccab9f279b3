//! Handle for queueing index changes
//!
//! `ChangeSender` is cheap to clone and can be handed to whatever fires the
//! record store's change notifications. Every operation either awaits its
//! own completion or takes a callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc, oneshot};

use super::stats::{ChangeQueueStats, ChangeQueueStatsSnapshot};
use super::types::{ChangeMessage, ChangeOutcome, CompletionCallback, MAX_PENDING_MESSAGES};
use crate::search::errors::{SearchError, SearchResult};
use crate::store::Record;

#[derive(Clone)]
pub struct ChangeSender {
    pub(super) sender: mpsc::UnboundedSender<ChangeMessage>,
    pub(super) completion_callbacks: Arc<Mutex<ahash::AHashMap<u64, CompletionCallback>>>,
    pub(super) next_completion_id: Arc<AtomicU64>,
    pub(super) pending_operations: Arc<AtomicUsize>,
    pub(super) stats: Arc<ChangeQueueStats>,
}

impl std::fmt::Debug for ChangeSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSender")
            .field(
                "pending_operations",
                &self.pending_operations.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl ChangeSender {
    /// Queue a record change and wait until it is applied
    pub async fn record_changed(
        &self,
        record_type: impl Into<String>,
        record: Record,
    ) -> SearchResult<ChangeOutcome> {
        let record_type = record_type.into();
        self.submit_and_wait(|completion_id| ChangeMessage::RecordChanged {
            record_type,
            record,
            completion_id,
        })
        .await
    }

    /// Queue a record change; `callback` receives the outcome once applied
    pub async fn record_changed_with<F>(
        &self,
        record_type: impl Into<String>,
        record: Record,
        callback: F,
    ) -> SearchResult<()>
    where
        F: FnOnce(SearchResult<ChangeOutcome>) + Send + 'static,
    {
        let record_type = record_type.into();
        self.submit(
            |completion_id| ChangeMessage::RecordChanged {
                record_type,
                record,
                completion_id,
            },
            Box::new(callback),
        )
        .await
    }

    /// Queue a record deletion and wait until it is applied
    pub async fn record_removed(
        &self,
        record_type: impl Into<String>,
        identity: impl Into<String>,
    ) -> SearchResult<ChangeOutcome> {
        let record_type = record_type.into();
        let identity = identity.into();
        self.submit_and_wait(|completion_id| ChangeMessage::RecordRemoved {
            record_type,
            identity,
            completion_id,
        })
        .await
    }

    /// Queue a full rebuild and wait until it finishes
    pub async fn rebuild(&self, auto_discover: bool) -> SearchResult<ChangeOutcome> {
        self.submit_and_wait(|completion_id| ChangeMessage::Rebuild {
            auto_discover,
            completion_id,
        })
        .await
    }

    /// Ask the worker to apply what is queued and stop
    pub fn shutdown(&self) -> SearchResult<()> {
        self.sender
            .send(ChangeMessage::Shutdown)
            .map_err(|_| disconnected())
    }

    /// Get current queue statistics
    #[must_use]
    pub fn stats(&self) -> ChangeQueueStatsSnapshot {
        self.stats.snapshot()
    }

    /// Check the worker is accepting messages without backpressure
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        !self.sender.is_closed()
            && self.pending_operations.load(Ordering::Relaxed) < MAX_PENDING_MESSAGES
    }

    async fn submit_and_wait(
        &self,
        message: impl FnOnce(u64) -> ChangeMessage,
    ) -> SearchResult<ChangeOutcome> {
        let (tx, rx) = oneshot::channel();
        self.submit(
            message,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await?;

        rx.await.map_err(|_| {
            SearchError::QueueUnavailable("worker stopped before applying the change".to_string())
        })?
    }

    async fn submit(
        &self,
        message: impl FnOnce(u64) -> ChangeMessage,
        callback: CompletionCallback,
    ) -> SearchResult<()> {
        let pending = self.pending_operations.load(Ordering::Relaxed);
        if pending >= MAX_PENDING_MESSAGES {
            return Err(SearchError::QueueUnavailable(format!(
                "backpressure: {pending} pending operations"
            )));
        }

        let completion_id = self.next_completion_id.fetch_add(1, Ordering::Relaxed);

        // Registered before sending so the worker always finds it
        self.completion_callbacks
            .lock()
            .await
            .insert(completion_id, callback);

        // Counted before sending; the worker may finish before `send` returns
        self.pending_operations.fetch_add(1, Ordering::Relaxed);
        self.stats.queued();

        if self.sender.send(message(completion_id)).is_ok() {
            Ok(())
        } else {
            self.pending_operations.fetch_sub(1, Ordering::Relaxed);
            self.stats.settled();
            self.completion_callbacks.lock().await.remove(&completion_id);
            Err(disconnected())
        }
    }
}

fn disconnected() -> SearchError {
    SearchError::QueueUnavailable("change queue worker disconnected".to_string())
}
