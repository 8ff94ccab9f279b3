//! Shared configuration constants for record search
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Per-token hit cap for the intersection tier
///
/// Large enough that intersecting per-token hit sets rarely loses a document
/// that matches every token, small enough to keep a query bounded.
pub const DEFAULT_TOKEN_HIT_LIMIT: usize = 1000;

/// Maximum edit distance for fuzzy title/content matching
///
/// tantivy builds Levenshtein automata for distances 0 through 2 only.
pub const DEFAULT_FUZZY_DISTANCE: u8 = 2;

/// Upper bound accepted for `fuzzy_distance`
pub const MAX_FUZZY_DISTANCE: u8 = 2;

/// Writer memory budget: 50MB
pub const DEFAULT_WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Indexing threads owned by the single writer
pub const DEFAULT_WRITER_THREADS: usize = 1;

/// Title snippets are short and usually cover the whole title
pub const DEFAULT_TITLE_SNIPPET_CHARS: usize = 150;

/// Content snippets get a wider window around the best fragment
pub const DEFAULT_CONTENT_SNIPPET_CHARS: usize = 250;

/// Separator placed between concatenated content attributes
pub const CONTENT_SEPARATOR: &str = "|||";

/// Attribute name that addresses the record identity itself
pub const IDENTITY_FIELD: &str = "name";

pub const DEFAULT_HIGHLIGHT_OPEN: &str = "<mark>";
pub const DEFAULT_HIGHLIGHT_CLOSE: &str = "</mark>";

/// Infrastructure record types never indexed by auto-discovery
pub const DEFAULT_EXCLUDED_RECORD_TYPES: &[&str] = &[
    "DocField",
    "Workspace Shortcut",
    "Activity Log",
    "Notification Settings",
];
