//! Core configuration types for record search

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::builder::SearchConfigBuilder;
use super::validation::ConfigError;
use crate::utils::{
    DEFAULT_CONTENT_SNIPPET_CHARS, DEFAULT_EXCLUDED_RECORD_TYPES, DEFAULT_FUZZY_DISTANCE,
    DEFAULT_HIGHLIGHT_CLOSE, DEFAULT_HIGHLIGHT_OPEN, DEFAULT_TITLE_SNIPPET_CHARS,
    DEFAULT_TOKEN_HIT_LIMIT, DEFAULT_WRITER_MEMORY_BYTES, DEFAULT_WRITER_THREADS, IDENTITY_FIELD,
};

/// Mapping from a record type's attributes to the indexed document fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordTypeProfile {
    /// Attribute supplying the title; the record identity when unset
    pub title_field: Option<String>,
    /// Attributes joined, in order, into the content body
    pub content_fields: Vec<String>,
    /// Attributes stored verbatim alongside the document, never tokenized
    pub extra_fields: Vec<String>,
}

impl RecordTypeProfile {
    pub fn new<I, S>(content_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title_field: None,
            content_fields: content_fields.into_iter().map(Into::into).collect(),
            extra_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title_field: impl Into<String>) -> Self {
        self.title_field = Some(title_field.into());
        self
    }

    #[must_use]
    pub fn with_extras<I, S>(mut self, extra_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_fields = extra_fields.into_iter().map(Into::into).collect();
        self
    }

    /// Attribute the title is read from
    #[must_use]
    pub fn title_field(&self) -> &str {
        self.title_field.as_deref().unwrap_or(IDENTITY_FIELD)
    }

    /// Every attribute a record of this type must be read with
    #[must_use]
    pub fn projection(&self) -> Vec<&str> {
        let mut projection: Vec<&str> = Vec::with_capacity(
            2 + self.content_fields.len() + self.extra_fields.len(),
        );
        for name in std::iter::once(self.title_field())
            .chain(self.content_fields.iter().map(String::as_str))
            .chain(self.extra_fields.iter().map(String::as_str))
            .chain(std::iter::once(IDENTITY_FIELD))
        {
            if !projection.contains(&name) {
                projection.push(name);
            }
        }
        projection
    }
}

/// Main configuration for indexing and query resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// On-disk index location; `None` keeps the index in memory
    pub(crate) index_dir: Option<PathBuf>,
    pub(crate) writer_memory_bytes: usize,
    pub(crate) writer_threads: usize,
    pub(crate) token_hit_limit: usize,
    pub(crate) fuzzy_distance: u8,
    pub(crate) fuzzy_prefix: bool,
    pub(crate) title_snippet_chars: usize,
    pub(crate) content_snippet_chars: usize,
    pub(crate) highlight_open: String,
    pub(crate) highlight_close: String,
    /// Fall back to store metadata when a changed record's type has no profile
    pub(crate) auto_discover: bool,
    /// Record types auto-discovery never indexes
    pub(crate) excluded_record_types: Vec<String>,
    pub(crate) profiles: BTreeMap<String, RecordTypeProfile>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_dir: None,
            writer_memory_bytes: DEFAULT_WRITER_MEMORY_BYTES,
            writer_threads: DEFAULT_WRITER_THREADS,
            token_hit_limit: DEFAULT_TOKEN_HIT_LIMIT,
            fuzzy_distance: DEFAULT_FUZZY_DISTANCE,
            fuzzy_prefix: true,
            title_snippet_chars: DEFAULT_TITLE_SNIPPET_CHARS,
            content_snippet_chars: DEFAULT_CONTENT_SNIPPET_CHARS,
            highlight_open: DEFAULT_HIGHLIGHT_OPEN.to_string(),
            highlight_close: DEFAULT_HIGHLIGHT_CLOSE.to_string(),
            auto_discover: false,
            excluded_record_types: DEFAULT_EXCLUDED_RECORD_TYPES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            profiles: BTreeMap::new(),
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SearchConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn index_dir(&self) -> Option<&Path> {
        self.index_dir.as_deref()
    }

    #[must_use]
    pub fn writer_memory_bytes(&self) -> usize {
        self.writer_memory_bytes
    }

    #[must_use]
    pub fn writer_threads(&self) -> usize {
        self.writer_threads
    }

    #[must_use]
    pub fn token_hit_limit(&self) -> usize {
        self.token_hit_limit
    }

    #[must_use]
    pub fn fuzzy_distance(&self) -> u8 {
        self.fuzzy_distance
    }

    #[must_use]
    pub fn fuzzy_prefix(&self) -> bool {
        self.fuzzy_prefix
    }

    #[must_use]
    pub fn title_snippet_chars(&self) -> usize {
        self.title_snippet_chars
    }

    #[must_use]
    pub fn content_snippet_chars(&self) -> usize {
        self.content_snippet_chars
    }

    #[must_use]
    pub fn highlight_markers(&self) -> (&str, &str) {
        (&self.highlight_open, &self.highlight_close)
    }

    #[must_use]
    pub fn auto_discover(&self) -> bool {
        self.auto_discover
    }

    #[must_use]
    pub fn is_excluded(&self, record_type: &str) -> bool {
        self.excluded_record_types.iter().any(|t| t == record_type)
    }

    #[must_use]
    pub fn profile(&self, record_type: &str) -> Option<&RecordTypeProfile> {
        self.profiles.get(record_type)
    }

    #[must_use]
    pub fn profiles(&self) -> &BTreeMap<String, RecordTypeProfile> {
        &self.profiles
    }
}
