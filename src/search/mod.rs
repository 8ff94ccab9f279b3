//! Full-text search over store records using Tantivy
//!
//! Records of every type share one index. The synchronizer keeps it aligned
//! with the record store; the resolver answers free-text queries through a
//! tiered retrieval strategy and returns highlighted results, optionally
//! diversified across record types.

pub mod engine;
pub mod errors;
pub mod incremental;
pub mod indexer;
pub mod query;
pub mod schema;
pub mod service;
pub mod types;

pub use engine::{IndexStats, SearchEngine};
pub use errors::{SearchError, SearchResult};
pub use incremental::{ChangeOutcome, ChangeQueue, ChangeSender};
pub use indexer::{IndexSynchronizer, ProfileSource, ResolvedProfile};
pub use query::{QueryResolver, Resolution};
pub use schema::SearchSchema;
pub use service::SearchService;
pub use types::{
    HighlightedResult, IndexedDocument, ResolutionTier, ResultGroup, ResultSet, SearchPage,
};
