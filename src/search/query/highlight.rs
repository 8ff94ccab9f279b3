//! Snippet highlighting of resolved candidates
//!
//! Title and content are highlighted independently against the non-fuzzy
//! form of the whole query. A field without any highlighted term falls back
//! to its plain stored text.

use std::collections::BTreeMap;
use std::ops::Range;

use tantivy::query::Query;
use tantivy::schema::{Field, Value};
use tantivy::snippet::SnippetGenerator;
use tantivy::{DocAddress, Searcher, TantivyDocument};

use crate::config::SearchConfig;
use crate::search::errors::SearchResult;
use crate::search::schema::SearchSchema;
use crate::search::types::HighlightedResult;
use crate::store::{FieldValue, RecordStore};

/// Highlights candidates of one query against one searcher snapshot
pub struct Highlighter<'a> {
    searcher: &'a Searcher,
    schema: &'a SearchSchema,
    store: &'a dyn RecordStore,
    title_snippets: SnippetGenerator,
    content_snippets: SnippetGenerator,
    open: &'a str,
    close: &'a str,
}

impl<'a> Highlighter<'a> {
    pub fn new(
        searcher: &'a Searcher,
        schema: &'a SearchSchema,
        query: &dyn Query,
        config: &'a SearchConfig,
        store: &'a dyn RecordStore,
    ) -> SearchResult<Self> {
        let mut title_snippets = SnippetGenerator::create(searcher, query, schema.title)?;
        title_snippets.set_max_num_chars(config.title_snippet_chars());

        let mut content_snippets = SnippetGenerator::create(searcher, query, schema.content)?;
        content_snippets.set_max_num_chars(config.content_snippet_chars());

        let (open, close) = config.highlight_markers();

        Ok(Self {
            searcher,
            schema,
            store,
            title_snippets,
            content_snippets,
            open,
            close,
        })
    }

    /// Load one candidate's stored fields and highlight them
    pub fn highlight(&self, address: DocAddress) -> SearchResult<HighlightedResult> {
        let doc: TantivyDocument = self.searcher.doc(address)?;

        let id = stored_text(&doc, self.schema.id);
        let name = stored_text(&doc, self.schema.name);
        let title = stored_text(&doc, self.schema.title);
        let content = stored_text(&doc, self.schema.content);
        let doctype = stored_text(&doc, self.schema.doctype);
        let extras = decode_extras(&id, &stored_text(&doc, self.schema.extras));

        let (highlighted_title, title_highlight_count) =
            self.render(&self.title_snippets, &title);
        let (highlighted_content, content_highlight_count) =
            self.render(&self.content_snippets, &content);

        let url = self.store.url_for(&doctype, &name);

        Ok(HighlightedResult {
            id,
            name,
            title,
            content,
            doctype,
            url,
            extras,
            highlighted_title,
            highlighted_content,
            title_highlight_count,
            content_highlight_count,
            address,
        })
    }

    fn render(&self, generator: &SnippetGenerator, text: &str) -> (String, usize) {
        let snippet = generator.snippet(text);
        let ranges = snippet.highlighted();
        if ranges.is_empty() {
            return (text.to_string(), 0);
        }
        (
            render_fragment(snippet.fragment(), ranges, self.open, self.close),
            ranges.len(),
        )
    }
}

/// Escape `fragment` as HTML text and wrap each highlighted byte range in
/// the given markers. Markers are inserted verbatim.
pub fn render_fragment(fragment: &str, ranges: &[Range<usize>], open: &str, close: &str) -> String {
    let mut html = String::with_capacity(fragment.len() + ranges.len() * (open.len() + close.len()));
    let mut cursor = 0;

    for range in ranges {
        let (start, end) = (range.start.max(cursor), range.end.min(fragment.len()));
        if start >= end {
            continue;
        }
        let (Some(before), Some(marked)) = (fragment.get(cursor..start), fragment.get(start..end))
        else {
            continue;
        };
        html.push_str(&html_escape::encode_text(before));
        html.push_str(open);
        html.push_str(&html_escape::encode_text(marked));
        html.push_str(close);
        cursor = end;
    }

    if let Some(rest) = fragment.get(cursor..) {
        html.push_str(&html_escape::encode_text(rest));
    }
    html
}

fn stored_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string()
}

fn decode_extras(id: &str, json: &str) -> BTreeMap<String, FieldValue> {
    if json.is_empty() {
        return BTreeMap::new();
    }
    serde_json::from_str(json).unwrap_or_else(|e| {
        tracing::warn!(id, error = %e, "Stored extras are not valid JSON; dropping them");
        BTreeMap::new()
    })
}
