//! Three-tier candidate resolution
//!
//! 1. Intersect the fuzzy hits of every query token.
//! 2. If that is empty, search the whole query fuzzily, capped at a third of
//!    the budget.
//! 3. If that is empty too, take an equal share of every token's hits.
//!
//! A tier runs only when the previous one produced nothing. Ordering here is
//! generation order; final relevance ordering happens after highlighting.

use ahash::AHashSet;
use tantivy::collector::TopDocs;
use tantivy::{DocAddress, Searcher};

use crate::search::engine::SearchEngine;
use crate::search::errors::{SearchError, SearchResult};
use crate::search::types::ResolutionTier;

/// Ranked fuzzy retrieval the resolver is built on
pub trait HitSource {
    /// Addresses matching `text` fuzzily across title, content and name,
    /// best first, at most `limit` of them
    fn fuzzy_hits(&self, text: &str, limit: usize) -> SearchResult<Vec<DocAddress>>;
}

/// [`HitSource`] over one searcher snapshot
pub struct IndexHitSource<'a> {
    engine: &'a SearchEngine,
    searcher: &'a Searcher,
}

impl<'a> IndexHitSource<'a> {
    #[must_use]
    pub fn new(engine: &'a SearchEngine, searcher: &'a Searcher) -> Self {
        Self { engine, searcher }
    }
}

impl HitSource for IndexHitSource<'_> {
    fn fuzzy_hits(&self, text: &str, limit: usize) -> SearchResult<Vec<DocAddress>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = self.engine.parse_fuzzy(text)?;
        let top_docs = self
            .searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .map_err(SearchError::Tantivy)?;
        Ok(top_docs.into_iter().map(|(_, address)| address).collect())
    }
}

/// Candidates for one query
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Resolved addresses, unique, in generation order
    pub candidates: Vec<DocAddress>,
    /// Every address retrieved along the way, unique, in retrieval order:
    /// each token's hits in token order, then whole-query hits
    pub retrieved: Vec<DocAddress>,
    pub tier: ResolutionTier,
    /// Searches issued against the source
    pub searches: usize,
}

impl Resolution {
    fn empty(searches: usize) -> Self {
        Self {
            candidates: Vec::new(),
            retrieved: Vec::new(),
            tier: ResolutionTier::Empty,
            searches,
        }
    }
}

/// Resolve `query_text` into candidate addresses.
///
/// An empty query, a query of only whitespace, and a zero budget all resolve
/// to no candidates without searching. Tokens that do not parse are left out;
/// the parse error is returned only when no token parses.
pub fn resolve_candidates(
    source: &dyn HitSource,
    query_text: &str,
    budget: usize,
    token_hit_limit: usize,
) -> SearchResult<Resolution> {
    let tokens: Vec<&str> = query_text.split_whitespace().collect();
    if tokens.is_empty() || budget == 0 {
        return Ok(Resolution::empty(0));
    }

    let mut searches = 0usize;
    let mut token_hits: Vec<Vec<DocAddress>> = Vec::with_capacity(tokens.len());
    let mut parse_error = None;
    for token in &tokens {
        match source.fuzzy_hits(token, token_hit_limit) {
            Ok(hits) => {
                searches += 1;
                token_hits.push(unique(hits));
            }
            Err(e @ SearchError::QueryParse { .. }) => {
                tracing::debug!(token, error = %e, "Skipping unparseable token");
                parse_error.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    if token_hits.is_empty() {
        if let Some(e) = parse_error {
            return Err(e);
        }
    }

    if token_hits.iter().all(Vec::is_empty) {
        tracing::debug!(query = %query_text, searches, "No token matched");
        return Ok(Resolution::empty(searches));
    }

    let mut retrieved = Vec::new();
    let mut seen = AHashSet::new();
    for hits in &token_hits {
        extend_unique(&mut retrieved, &mut seen, hits.iter().copied());
    }

    let intersection = intersect(&token_hits);
    if !intersection.is_empty() {
        tracing::debug!(query = %query_text, candidates = intersection.len(), "Resolved by intersection");
        return Ok(Resolution {
            candidates: intersection,
            retrieved,
            tier: ResolutionTier::Intersection,
            searches,
        });
    }

    let whole_query_cap = budget / 3;
    if whole_query_cap > 0 {
        let hits = match source.fuzzy_hits(query_text, whole_query_cap) {
            Ok(hits) => {
                searches += 1;
                unique(hits)
            }
            Err(SearchError::QueryParse { message, .. }) => {
                tracing::debug!(query = %query_text, error = %message, "Whole query does not parse");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        extend_unique(&mut retrieved, &mut seen, hits.iter().copied());
        if !hits.is_empty() {
            tracing::debug!(query = %query_text, candidates = hits.len(), "Resolved by whole query");
            return Ok(Resolution {
                candidates: hits,
                retrieved,
                tier: ResolutionTier::WholeQuery,
                searches,
            });
        }
    }

    let per_token = budget / token_hits.len();
    let mut merged = Vec::new();
    let mut merged_seen = AHashSet::new();
    for hits in &token_hits {
        extend_unique(&mut merged, &mut merged_seen, hits.iter().take(per_token).copied());
    }

    let tier = if merged.is_empty() {
        ResolutionTier::Empty
    } else {
        ResolutionTier::TokenMerge
    };
    tracing::debug!(query = %query_text, candidates = merged.len(), per_token, ?tier, "Resolved by token merge");

    Ok(Resolution {
        candidates: merged,
        retrieved,
        tier,
        searches,
    })
}

/// Addresses present in every hit list, in the first list's order
fn intersect(token_hits: &[Vec<DocAddress>]) -> Vec<DocAddress> {
    let Some((first, rest)) = token_hits.split_first() else {
        return Vec::new();
    };
    let rest_sets: Vec<AHashSet<DocAddress>> = rest
        .iter()
        .map(|hits| hits.iter().copied().collect())
        .collect();

    first
        .iter()
        .copied()
        .filter(|address| rest_sets.iter().all(|set| set.contains(address)))
        .collect()
}

fn unique(hits: Vec<DocAddress>) -> Vec<DocAddress> {
    let mut seen = AHashSet::with_capacity(hits.len());
    hits.into_iter().filter(|a| seen.insert(*a)).collect()
}

fn extend_unique(
    out: &mut Vec<DocAddress>,
    seen: &mut AHashSet<DocAddress>,
    hits: impl Iterator<Item = DocAddress>,
) {
    for address in hits {
        if seen.insert(address) {
            out.push(address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned hits per search text, recording every call
    #[derive(Default)]
    struct FakeSource {
        hits: HashMap<String, Vec<DocAddress>>,
        unparseable: Vec<String>,
        calls: RefCell<Vec<(String, usize)>>,
    }

    impl FakeSource {
        fn with(mut self, text: &str, docs: &[u32]) -> Self {
            self.hits.insert(
                text.to_string(),
                docs.iter().map(|d| DocAddress::new(0, *d)).collect(),
            );
            self
        }

        fn rejecting(mut self, text: &str) -> Self {
            self.unparseable.push(text.to_string());
            self
        }
    }

    impl HitSource for FakeSource {
        fn fuzzy_hits(&self, text: &str, limit: usize) -> SearchResult<Vec<DocAddress>> {
            if self.unparseable.iter().any(|t| t == text) {
                return Err(SearchError::QueryParse {
                    query: text.to_string(),
                    message: "Syntax Error".to_string(),
                });
            }
            self.calls.borrow_mut().push((text.to_string(), limit));
            Ok(self
                .hits
                .get(text)
                .map(|hits| hits.iter().take(limit).copied().collect())
                .unwrap_or_default())
        }
    }

    fn docs(ids: &[u32]) -> Vec<DocAddress> {
        ids.iter().map(|d| DocAddress::new(0, *d)).collect()
    }

    #[test]
    fn intersection_short_circuits_later_tiers() {
        let source = FakeSource::default()
            .with("alpha", &[1, 2, 3])
            .with("beta", &[3, 2, 9]);

        let resolution = resolve_candidates(&source, "alpha beta", 10, 1000).unwrap();
        assert_eq!(resolution.tier, ResolutionTier::Intersection);
        assert_eq!(resolution.candidates, docs(&[2, 3]));
        assert_eq!(resolution.searches, 2);
        assert_eq!(source.calls.borrow().len(), 2);
        assert_eq!(resolution.retrieved, docs(&[1, 2, 3, 9]));
    }

    #[test]
    fn no_token_hits_skips_fallbacks() {
        let source = FakeSource::default();
        let resolution = resolve_candidates(&source, "zzzqqq", 10, 1000).unwrap();
        assert_eq!(resolution.tier, ResolutionTier::Empty);
        assert!(resolution.candidates.is_empty());
        assert_eq!(source.calls.borrow().len(), 1);
    }

    #[test]
    fn whole_query_is_capped_at_a_third_of_budget() {
        let source = FakeSource::default()
            .with("alpha", &[1])
            .with("beta", &[2])
            .with("alpha beta", &[4, 5, 6, 7]);

        let resolution = resolve_candidates(&source, "alpha beta", 9, 1000).unwrap();
        assert_eq!(resolution.tier, ResolutionTier::WholeQuery);
        assert_eq!(resolution.candidates, docs(&[4, 5, 6]));
        assert_eq!(source.calls.borrow()[2], ("alpha beta".to_string(), 3));
        assert_eq!(resolution.searches, 3);
    }

    #[test]
    fn small_budget_skips_whole_query_and_merges_tokens() {
        let source = FakeSource::default()
            .with("alpha", &[1, 2])
            .with("beta", &[3, 4])
            .with("alpha beta", &[5]);

        // 2 / 3 == 0: whole query never runs; 2 / 2 == 1 hit per token
        let resolution = resolve_candidates(&source, "alpha beta", 2, 1000).unwrap();
        assert_eq!(resolution.tier, ResolutionTier::TokenMerge);
        assert_eq!(resolution.candidates, docs(&[1, 3]));
        assert_eq!(resolution.searches, 2);
    }

    #[test]
    fn token_merge_with_zero_share_is_empty() {
        let source = FakeSource::default()
            .with("a", &[1])
            .with("b", &[2])
            .with("c", &[3]);

        let resolution = resolve_candidates(&source, "a b c", 2, 1000).unwrap();
        assert_eq!(resolution.tier, ResolutionTier::Empty);
        assert!(resolution.candidates.is_empty());
    }

    #[test]
    fn empty_query_and_zero_budget_do_not_search() {
        let source = FakeSource::default().with("alpha", &[1]);
        for (query, budget) in [("", 10), ("   \t ", 10), ("alpha", 0)] {
            let resolution = resolve_candidates(&source, query, budget, 1000).unwrap();
            assert_eq!(resolution.tier, ResolutionTier::Empty);
            assert_eq!(resolution.searches, 0);
        }
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn token_hit_limit_is_passed_through() {
        let source = FakeSource::default().with("alpha", &[1, 2, 3]);
        let resolution = resolve_candidates(&source, "alpha", 10, 2).unwrap();
        assert_eq!(resolution.candidates, docs(&[1, 2]));
        assert_eq!(source.calls.borrow()[0].1, 2);
    }

    #[test]
    fn unparseable_token_is_left_out() {
        let source = FakeSource::default()
            .rejecting("what's")
            .with("alpha", &[1, 2]);

        let resolution = resolve_candidates(&source, "what's alpha", 10, 1000).unwrap();
        assert_eq!(resolution.tier, ResolutionTier::Intersection);
        assert_eq!(resolution.candidates, docs(&[1, 2]));
        assert_eq!(resolution.searches, 1);
    }

    #[test]
    fn unparseable_whole_query_falls_through_to_token_merge() {
        let source = FakeSource::default()
            .with("alpha", &[1])
            .with("beta", &[2])
            .rejecting("alpha beta");

        let resolution = resolve_candidates(&source, "alpha beta", 9, 1000).unwrap();
        assert_eq!(resolution.tier, ResolutionTier::TokenMerge);
        assert_eq!(resolution.candidates, docs(&[1, 2]));
        assert_eq!(resolution.searches, 2);
    }

    #[test]
    fn query_with_no_parseable_token_is_an_error() {
        let source = FakeSource::default().rejecting("a:").rejecting("b:");
        let err = resolve_candidates(&source, "a: b:", 10, 1000).unwrap_err();
        assert!(matches!(err, SearchError::QueryParse { ref query, .. } if query == "a:"));
    }
}
