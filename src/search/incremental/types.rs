//! Message types and constants for the change queue

use crate::search::errors::SearchResult;
use crate::search::types::IndexedDocument;
use crate::store::Record;

/// Maximum number of pending change messages before backpressure
pub const MAX_PENDING_MESSAGES: usize = 10_000;

/// Messages collected before a batch is applied
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Maximum wait before applying a partial batch
pub const MAX_BATCH_WAIT_MS: u64 = 50;

/// A change the worker applies to the index
#[derive(Debug, Clone)]
pub enum ChangeMessage {
    /// Re-index one record
    RecordChanged {
        record_type: String,
        record: Record,
        completion_id: u64,
    },
    /// Delete one record's document
    RecordRemoved {
        record_type: String,
        identity: String,
        completion_id: u64,
    },
    /// Clear and re-index everything
    Rebuild {
        auto_discover: bool,
        completion_id: u64,
    },
    /// Apply what is queued, then stop
    Shutdown,
}

impl ChangeMessage {
    /// Document id this message targets; `None` for index-wide messages
    #[must_use]
    pub fn document_id(&self) -> Option<String> {
        match self {
            ChangeMessage::RecordChanged {
                record_type,
                record,
                ..
            } => Some(IndexedDocument::document_id(record_type, &record.identity)),
            ChangeMessage::RecordRemoved {
                record_type,
                identity,
                ..
            } => Some(IndexedDocument::document_id(record_type, identity)),
            ChangeMessage::Rebuild { .. } | ChangeMessage::Shutdown => None,
        }
    }

    #[must_use]
    pub fn completion_id(&self) -> Option<u64> {
        match self {
            ChangeMessage::RecordChanged { completion_id, .. }
            | ChangeMessage::RecordRemoved { completion_id, .. }
            | ChangeMessage::Rebuild { completion_id, .. } => Some(*completion_id),
            ChangeMessage::Shutdown => None,
        }
    }
}

/// What applying a change did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The record's document was replaced
    Indexed,
    /// The record type is not indexed; nothing was written
    Skipped,
    Removed,
    /// Full rebuild finished with this many records
    Rebuilt(usize),
    /// A later change to the same document in the same batch replaced this one
    Superseded,
}

/// Invoked once with the result of a queued change
pub type CompletionCallback = Box<dyn FnOnce(SearchResult<ChangeOutcome>) + Send + 'static>;
