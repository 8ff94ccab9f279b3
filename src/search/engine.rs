//! Core Tantivy search engine handle
//!
//! `SearchEngine` owns the index, its single writer, and a manually reloaded
//! reader. It is created by whoever bootstraps the system and passed to the
//! indexer and the query resolver; there is no process-wide index location.

use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::directory::MmapDirectory;
use tantivy::query::{EmptyQuery, Query, QueryParser};
use tantivy::{Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, Searcher};

use super::errors::{SearchError, SearchResult};
use super::schema::SearchSchema;
use crate::config::SearchConfig;

/// Main search engine managing Tantivy index operations
#[derive(Clone)]
pub struct SearchEngine {
    index: Index,
    schema: SearchSchema,
    reader: IndexReader,
    writer: Arc<Mutex<IndexWriter>>,
    exact_parser: QueryParser,
    fuzzy_parser: QueryParser,
    index_path: Option<PathBuf>,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("index_path", &self.index_path)
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    /// Create the index if missing, or open it, as configured.
    ///
    /// An on-disk index whose schema differs from the current one is
    /// recreated empty; a rebuild is then required.
    pub fn open(config: &SearchConfig) -> SearchResult<Self> {
        let schema = SearchSchema::build();

        let index = match config.index_dir() {
            None => Index::create_in_ram(schema.schema.clone()),
            Some(index_dir) => Self::create_or_open_dir(index_dir, &schema)?,
        };

        Self::from_index(index, schema, config, config.index_dir().map(Path::to_path_buf))
    }

    /// Open an index that must already exist on disk
    pub fn open_existing(index_dir: &Path, config: &SearchConfig) -> SearchResult<Self> {
        let schema = SearchSchema::build();
        let index = Index::open_in_dir(index_dir).map_err(|e| unavailable(index_dir, e))?;

        if !schema.is_compatible_with(&index.schema()) {
            return Err(unavailable(
                index_dir,
                "index schema does not match the current schema; rebuild required",
            ));
        }

        Self::from_index(index, schema, config, Some(index_dir.to_path_buf()))
    }

    fn create_or_open_dir(index_dir: &Path, schema: &SearchSchema) -> SearchResult<Index> {
        std::fs::create_dir_all(index_dir).map_err(|e| unavailable(index_dir, e))?;

        if index_dir.join("meta.json").exists() {
            let existing_index =
                Index::open_in_dir(index_dir).map_err(|e| unavailable(index_dir, e))?;

            if schema.is_compatible_with(&existing_index.schema()) {
                return Ok(existing_index);
            }

            tracing::warn!(
                existing_fields = existing_index.schema().num_fields(),
                expected_fields = schema.schema.num_fields(),
                path = %index_dir.display(),
                "Schema mismatch detected - recreating index"
            );

            drop(existing_index);
            std::fs::remove_dir_all(index_dir).map_err(|e| unavailable(index_dir, e))?;
            std::fs::create_dir_all(index_dir).map_err(|e| unavailable(index_dir, e))?;
        }

        let mmap_directory = MmapDirectory::open(index_dir).map_err(|e| unavailable(index_dir, e))?;
        Index::create(mmap_directory, schema.schema.clone(), IndexSettings::default())
            .map_err(|e| unavailable(index_dir, e))
    }

    fn from_index(
        index: Index,
        schema: SearchSchema,
        config: &SearchConfig,
        index_path: Option<PathBuf>,
    ) -> SearchResult<Self> {
        let location = index_path
            .as_deref()
            .map_or_else(|| "<memory>".to_string(), |p| p.display().to_string());

        SearchSchema::register_tokenizers(index.tokenizers());

        // Tantivy allows one writer per index; it lives as long as the engine
        let writer: IndexWriter = index
            .writer_with_num_threads(config.writer_threads(), config.writer_memory_bytes())
            .map_err(|e| SearchError::IndexUnavailable {
                path: location.clone(),
                message: format!("failed to acquire index writer: {e}"),
            })?;

        // Reloaded explicitly after every commit, so reads follow writes
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexUnavailable {
                path: location.clone(),
                message: format!("failed to create index reader: {e}"),
            })?;

        let exact_parser = QueryParser::for_index(&index, schema.query_fields());

        let mut fuzzy_parser = QueryParser::for_index(&index, schema.query_fields());
        for field in [schema.title, schema.content] {
            fuzzy_parser.set_field_fuzzy(
                field,
                config.fuzzy_prefix(),
                config.fuzzy_distance(),
                true,
            );
        }

        tracing::debug!(
            path = %location,
            num_docs = reader.searcher().num_docs(),
            "Search index opened"
        );

        Ok(SearchEngine {
            index,
            schema,
            reader,
            writer: Arc::new(Mutex::new(writer)),
            exact_parser,
            fuzzy_parser,
            index_path,
        })
    }

    /// Get a reference to the search schema
    #[must_use]
    pub fn schema(&self) -> &SearchSchema {
        &self.schema
    }

    /// Get the Tantivy index
    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn index_path(&self) -> Option<&Path> {
        self.index_path.as_deref()
    }

    /// Snapshot of the index as of the last commit
    #[must_use]
    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    /// Acquire the writer exclusively.
    ///
    /// Held for the whole of an upsert or rebuild so concurrent replacements
    /// of the same document serialize.
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, IndexWriter> {
        self.writer.lock()
    }

    /// Commit pending writes and make them visible to new searchers
    pub(crate) fn commit(&self, writer: &mut IndexWriter, target: &str) -> SearchResult<u64> {
        let start = std::time::Instant::now();

        let opstamp = writer
            .commit()
            .map_err(|e| SearchError::write(target, format!("commit failed: {e}")))?;
        self.reader
            .reload()
            .map_err(|e| SearchError::write(target, format!("reader reload failed: {e}")))?;

        tracing::debug!(
            target_doc = %target,
            opstamp,
            duration_ms = start.elapsed().as_millis(),
            "Index commit and reload completed"
        );
        Ok(opstamp)
    }

    /// Parse `text` against title, content and name without fuzziness.
    ///
    /// Clauses that do not parse are dropped; the text is rejected only when
    /// nothing of it survives.
    pub fn parse_exact(&self, text: &str) -> SearchResult<Box<dyn Query>> {
        parse_lenient(&self.exact_parser, text)
    }

    /// Parse `text` with fuzzy matching on title and content, leniently
    pub fn parse_fuzzy(&self, text: &str) -> SearchResult<Box<dyn Query>> {
        parse_lenient(&self.fuzzy_parser, text)
    }

    /// Get index statistics
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let searcher = self.reader.searcher();
        IndexStats {
            num_documents: searcher.num_docs(),
            num_segments: searcher.segment_readers().len(),
        }
    }
}

fn unavailable(path: &Path, error: impl std::fmt::Display) -> SearchError {
    SearchError::IndexUnavailable {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

fn parse_lenient(parser: &QueryParser, text: &str) -> SearchResult<Box<dyn Query>> {
    let (query, errors) = parser.parse_query_lenient(text);
    if let Some(first) = errors.first() {
        if query.is::<EmptyQuery>() {
            return Err(query_error(text, first));
        }
        tracing::debug!(
            query = %text,
            dropped = errors.len(),
            error = %first,
            "Dropped unparseable query clauses"
        );
    }
    Ok(query)
}

fn query_error(text: &str, error: impl std::fmt::Display) -> SearchError {
    SearchError::QueryParse {
        query: text.to_string(),
        message: error.to_string(),
    }
}

/// Index statistics information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub num_documents: u64,
    pub num_segments: usize,
}
