//! Counters describing the change queue's progress

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Shared between the worker and every sender
#[derive(Debug, Default)]
pub struct ChangeQueueStats {
    applied: AtomicUsize,
    failed: AtomicUsize,
    superseded: AtomicUsize,
    pending: AtomicUsize,
    batches: AtomicUsize,
    last_rebuild: Mutex<Option<Instant>>,
}

impl ChangeQueueStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn queued(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// A queued change was withdrawn or completed
    pub(super) fn settled(&self) {
        self.pending.fetch_sub(1, Ordering::Relaxed);
    }

    pub(super) fn record_applied(&self, rebuild: bool) {
        self.applied.fetch_add(1, Ordering::Relaxed);
        if rebuild {
            *self.last_rebuild.lock() = Some(Instant::now());
        }
    }

    pub(super) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> ChangeQueueStatsSnapshot {
        ChangeQueueStatsSnapshot {
            total_processed: self.applied.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            total_superseded: self.superseded.load(Ordering::Relaxed),
            pending_count: self.pending.load(Ordering::Relaxed),
            batch_count: self.batches.load(Ordering::Relaxed),
            last_rebuild: *self.last_rebuild.lock(),
        }
    }
}

/// Point-in-time copy of [`ChangeQueueStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeQueueStatsSnapshot {
    /// Changes applied successfully
    pub total_processed: usize,
    pub total_failed: usize,
    /// Changes replaced by a later change to the same document
    pub total_superseded: usize,
    pub pending_count: usize,
    pub batch_count: usize,
    pub last_rebuild: Option<Instant>,
}
