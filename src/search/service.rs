//! Entry points for the rest of the system
//!
//! `SearchService` wires one engine, one configuration and one record store
//! into the synchronizer and the resolver. Whoever bootstraps the system owns
//! it; components never reach for a global index.

use std::sync::Arc;

use super::engine::{IndexStats, SearchEngine};
use super::errors::SearchResult;
use super::indexer::IndexSynchronizer;
use super::query::QueryResolver;
use super::types::SearchPage;
use crate::config::SearchConfig;
use crate::store::{AttributeAccessor, RecordStore};

#[derive(Clone)]
pub struct SearchService {
    engine: SearchEngine,
    config: Arc<SearchConfig>,
    synchronizer: IndexSynchronizer,
    resolver: QueryResolver,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl SearchService {
    /// Validate `config`, open its index, and bind it to `store`
    pub fn open(config: SearchConfig, store: Arc<dyn RecordStore>) -> SearchResult<Self> {
        config.validate()?;
        let engine = SearchEngine::open(&config)?;
        Ok(Self::with_engine(engine, config, store))
    }

    /// Bind an already opened engine
    #[must_use]
    pub fn with_engine(engine: SearchEngine, config: SearchConfig, store: Arc<dyn RecordStore>) -> Self {
        let config = Arc::new(config);
        Self {
            synchronizer: IndexSynchronizer::new(engine.clone(), config.clone(), store.clone()),
            resolver: QueryResolver::new(engine.clone(), config.clone(), store),
            engine,
            config,
        }
    }

    /// Drop the whole index and re-index every eligible record type.
    /// Returns the number of records written.
    pub fn rebuild_index(&self, auto_discover: bool) -> SearchResult<usize> {
        self.synchronizer.rebuild(auto_discover)
    }

    /// Resolve a free-text query into at most `budget` highlighted results
    pub fn resolve_query(&self, query_text: &str, budget: usize, grouped: bool) -> SearchResult<SearchPage> {
        self.resolver.resolve(query_text, budget, grouped)
    }

    /// Re-index one changed record.
    ///
    /// Call for every record change regardless of type; `false` means the
    /// record type is not indexed and nothing was written.
    pub fn notify_record_changed(
        &self,
        record_type: &str,
        record: &dyn AttributeAccessor,
    ) -> SearchResult<bool> {
        self.synchronizer.upsert(record_type, record)
    }

    /// Delete one record's document
    pub fn remove_record(&self, record_type: &str, identity: &str) -> SearchResult<()> {
        self.synchronizer.remove(record_type, identity)
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        self.engine.stats()
    }

    #[must_use]
    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}
