//! Asynchronous change queue
//!
//! Change notifications from the record store arrive at arbitrary times and
//! from arbitrary tasks. This module funnels them through a tokio channel to
//! one background worker, which applies them against the index one at a time.
//!
//! - `types` - message types and constants
//! - `stats` - lock-free statistics
//! - `sender` - the cloneable handle callers use
//! - `service` - the worker loop with batching and deduplication
//!
//! # Example
//!
//! ```ignore
//! let (queue, sender) = ChangeQueue::start(service).await;
//! let outcome = sender.record_changed("Note", record).await?;
//! queue.shutdown().await?;
//! ```

mod sender;
mod service;
mod stats;
mod types;

pub use sender::ChangeSender;
pub use service::ChangeQueue;
pub use stats::{ChangeQueueStats, ChangeQueueStatsSnapshot};
pub use types::{
    ChangeMessage, ChangeOutcome, CompletionCallback, DEFAULT_BATCH_SIZE, MAX_BATCH_WAIT_MS,
    MAX_PENDING_MESSAGES,
};

#[cfg(test)]
mod tests;
