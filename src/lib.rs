//! Full-text search for typed records
//!
//! Records live in an external [`RecordStore`]; each record type is mapped to
//! an index document through a [`RecordTypeProfile`]. [`SearchService`] is the
//! entry point: it rebuilds the index, applies change notifications, and
//! resolves queries into highlighted, budget-bounded result pages.

pub mod config;
pub mod search;
pub mod store;
pub mod utils;

pub use config::{ConfigError, RecordTypeProfile, SearchConfig, SearchConfigBuilder};
pub use search::{
    ChangeOutcome, ChangeQueue, ChangeSender, HighlightedResult, IndexStats, ResolutionTier,
    ResultGroup, ResultSet, SearchEngine, SearchError, SearchPage, SearchResult, SearchService,
};
pub use store::{AttributeAccessor, FieldValue, MemoryStore, Record, RecordStore, RecordTypeMeta};
