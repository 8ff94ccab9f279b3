//! Query resolution and result shaping
//!
//! A query runs in four steps against a single searcher snapshot: resolve
//! candidates through the retrieval tiers, highlight every retrieved
//! candidate, rank by highlight counts, then trim to the budget (optionally
//! sharing it fairly between record types).

mod highlight;
mod resolver;
mod shaper;

pub use highlight::{Highlighter, render_fragment};
pub use resolver::{HitSource, IndexHitSource, Resolution, resolve_candidates};
pub use shaper::{rank, shape};

use ahash::AHashSet;
use std::sync::Arc;
use std::time::Instant;
use tantivy::query::{EmptyQuery, Query};

use crate::config::SearchConfig;
use crate::search::engine::SearchEngine;
use crate::search::errors::{SearchError, SearchResult};
use crate::search::types::SearchPage;
use crate::store::RecordStore;

/// Answers free-text queries against one engine
#[derive(Clone)]
pub struct QueryResolver {
    engine: SearchEngine,
    config: Arc<SearchConfig>,
    store: Arc<dyn RecordStore>,
}

impl QueryResolver {
    #[must_use]
    pub fn new(engine: SearchEngine, config: Arc<SearchConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            engine,
            config,
            store,
        }
    }

    /// Resolve `query_text` into at most `budget` highlighted results.
    ///
    /// Results are grouped by record type when `grouped` is set.
    pub fn resolve(&self, query_text: &str, budget: usize, grouped: bool) -> SearchResult<SearchPage> {
        crate::log_search_operation!(self.resolve_inner(query_text, budget, grouped), query_text)
    }

    fn resolve_inner(&self, query_text: &str, budget: usize, grouped: bool) -> SearchResult<SearchPage> {
        let start = Instant::now();
        let searcher = self.engine.searcher();

        let source = IndexHitSource::new(&self.engine, &searcher);
        let resolution =
            resolve_candidates(&source, query_text, budget, self.config.token_hit_limit())?;

        if resolution.candidates.is_empty() {
            tracing::info!(
                query = %query_text,
                budget,
                searches = resolution.searches,
                "Search found no candidates"
            );
            return Ok(SearchPage::empty(grouped, start.elapsed(), resolution.searches));
        }

        // Tokens can parse where the whole text does not; highlight nothing then
        let exact_query: Box<dyn Query> = match self.engine.parse_exact(query_text) {
            Ok(query) => query,
            Err(SearchError::QueryParse { message, .. }) => {
                tracing::debug!(query = %query_text, error = %message, "No highlight query");
                Box::new(EmptyQuery)
            }
            Err(e) => return Err(e),
        };
        let highlighter = Highlighter::new(
            &searcher,
            self.engine.schema(),
            &*exact_query,
            &self.config,
            &*self.store,
        )?;

        // Highlight in retrieval order so ranking ties stay deterministic
        let resolved: AHashSet<_> = resolution.candidates.iter().copied().collect();
        let mut results = resolution
            .retrieved
            .iter()
            .filter(|address| resolved.contains(address))
            .map(|address| highlighter.highlight(*address))
            .collect::<SearchResult<Vec<_>>>()?;

        rank(&mut results);
        let candidates = results.len();
        let (results, total) = shape(results, budget, grouped);

        let elapsed = start.elapsed();
        tracing::info!(
            query = %query_text,
            budget,
            grouped,
            tier = ?resolution.tier,
            searches = resolution.searches,
            candidates,
            results = total,
            duration_ms = elapsed.as_millis(),
            "Search completed successfully"
        );

        Ok(SearchPage {
            results,
            total,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            tier: resolution.tier,
            searches: resolution.searches,
            elapsed,
        })
    }
}
