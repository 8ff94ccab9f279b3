//! Fluent builder for `SearchConfig`
//!
//! The builder starts from production defaults and validates the complete
//! configuration in `build`, so an invalid profile never reaches the indexer.

use std::path::PathBuf;

use super::types::{RecordTypeProfile, SearchConfig};
use super::validation::ConfigError;

#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist the index under `dir` instead of memory
    #[must_use]
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.index_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn in_memory(mut self) -> Self {
        self.config.index_dir = None;
        self
    }

    #[must_use]
    pub fn writer_memory_bytes(mut self, bytes: usize) -> Self {
        self.config.writer_memory_bytes = bytes;
        self
    }

    #[must_use]
    pub fn writer_threads(mut self, threads: usize) -> Self {
        self.config.writer_threads = threads;
        self
    }

    /// Cap on hits collected per query token in the intersection tier
    #[must_use]
    pub fn token_hit_limit(mut self, limit: usize) -> Self {
        self.config.token_hit_limit = limit;
        self
    }

    /// Fuzzy matching applied to title and content during retrieval
    #[must_use]
    pub fn fuzzy(mut self, distance: u8, prefix: bool) -> Self {
        self.config.fuzzy_distance = distance;
        self.config.fuzzy_prefix = prefix;
        self
    }

    #[must_use]
    pub fn snippet_chars(mut self, title: usize, content: usize) -> Self {
        self.config.title_snippet_chars = title;
        self.config.content_snippet_chars = content;
        self
    }

    #[must_use]
    pub fn highlight_markers(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.config.highlight_open = open.into();
        self.config.highlight_close = close.into();
        self
    }

    #[must_use]
    pub fn auto_discover(mut self, enabled: bool) -> Self {
        self.config.auto_discover = enabled;
        self
    }

    /// Replace the auto-discovery deny-list
    #[must_use]
    pub fn excluded_record_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.excluded_record_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn profile(mut self, record_type: impl Into<String>, profile: RecordTypeProfile) -> Self {
        self.config.profiles.insert(record_type.into(), profile);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
