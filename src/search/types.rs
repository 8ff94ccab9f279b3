//! Common types used across the search module
//!
//! This module contains shared data structures and types that are used
//! by multiple components within the search system.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;
use tantivy::DocAddress;

use crate::store::FieldValue;

/// One document as written to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// `"{record_type}-{identity}"`
    pub id: String,
    pub name: String,
    pub title: String,
    pub content: String,
    pub doctype: String,
    pub extras: BTreeMap<String, FieldValue>,
}

impl IndexedDocument {
    /// Build the replace/delete key for a record
    #[must_use]
    pub fn document_id(record_type: &str, identity: &str) -> String {
        format!("{record_type}-{identity}")
    }
}

/// A candidate annotated with its highlighted snippets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightedResult {
    pub id: String,
    pub name: String,
    pub title: String,
    pub content: String,
    pub doctype: String,
    pub url: String,
    #[serde(rename = "fields")]
    pub extras: BTreeMap<String, FieldValue>,
    pub highlighted_title: String,
    pub highlighted_content: String,
    #[serde(rename = "no_of_title_highlights")]
    pub title_highlight_count: usize,
    #[serde(rename = "no_of_content_highlights")]
    pub content_highlight_count: usize,
    /// Index address, valid only within the query that produced it
    #[serde(skip)]
    pub address: DocAddress,
}

impl HighlightedResult {
    /// Ranking key, compared descending
    #[must_use]
    pub fn rank_key(&self) -> (usize, usize) {
        (self.title_highlight_count, self.content_highlight_count)
    }
}

/// Results of one record type after trimming
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGroup {
    pub doctype: String,
    pub results: Vec<HighlightedResult>,
}

/// Ordered result sequence, flat or grouped by record type
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    Flat(Vec<HighlightedResult>),
    /// Groups ordered by size, largest first
    Grouped(Vec<ResultGroup>),
}

impl ResultSet {
    #[must_use]
    pub fn empty(grouped: bool) -> Self {
        if grouped {
            ResultSet::Grouped(Vec::new())
        } else {
            ResultSet::Flat(Vec::new())
        }
    }

    /// Number of results across all groups
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Flat(results) => results.len(),
            ResultSet::Grouped(groups) => groups.iter().map(|g| g.results.len()).sum(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate every result, group by group
    pub fn iter(&self) -> Box<dyn Iterator<Item = &HighlightedResult> + '_> {
        match self {
            ResultSet::Flat(results) => Box::new(results.iter()),
            ResultSet::Grouped(groups) => Box::new(groups.iter().flat_map(|g| g.results.iter())),
        }
    }

    #[must_use]
    pub fn group(&self, doctype: &str) -> Option<&[HighlightedResult]> {
        match self {
            ResultSet::Flat(_) => None,
            ResultSet::Grouped(groups) => groups
                .iter()
                .find(|g| g.doctype == doctype)
                .map(|g| g.results.as_slice()),
        }
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResultSet::Flat(results) => results.serialize(serializer),
            ResultSet::Grouped(groups) => {
                let mut map = serializer.serialize_map(Some(groups.len()))?;
                for group in groups {
                    map.serialize_entry(&group.doctype, &group.results)?;
                }
                map.end()
            }
        }
    }
}

/// Which retrieval tier produced the candidate set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// Nothing searched or nothing matched any token
    Empty,
    /// Every token matched the same documents
    Intersection,
    /// Whole query, fuzzy, after an empty intersection
    WholeQuery,
    /// Equal share of each token's hits
    TokenMerge,
}

/// Final output of one query
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub results: ResultSet,
    pub total: usize,
    /// Elapsed milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: f64,
    pub tier: ResolutionTier,
    /// Index searches executed while resolving candidates
    pub searches: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SearchPage {
    pub(crate) fn empty(grouped: bool, elapsed: Duration, searches: usize) -> Self {
        Self {
            results: ResultSet::empty(grouped),
            total: 0,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            tier: ResolutionTier::Empty,
            searches,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_joins_type_and_identity() {
        assert_eq!(IndexedDocument::document_id("Note", "N-1"), "Note-N-1");
    }

    #[test]
    fn empty_grouped_page_serializes_as_map() {
        let page = SearchPage::empty(true, Duration::from_millis(3), 0);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["results"], serde_json::json!({}));
        assert_eq!(json["total"], 0);
        assert_eq!(json["tier"], "empty");
    }
}
