//! Configuration module for record search
//!
//! This module provides the `SearchConfig` struct, the per-record-type
//! `RecordTypeProfile`, and a builder with eager validation so malformed
//! profiles are rejected at load time rather than at index time.

// Sub-modules
pub mod builder;
pub mod types;
pub mod validation;

// Re-exports for public API
pub use builder::SearchConfigBuilder;
pub use types::{RecordTypeProfile, SearchConfig};
pub use validation::ConfigError;
