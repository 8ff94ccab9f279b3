//! Load-time validation of search configuration

use std::collections::HashSet;
use std::path::PathBuf;

use super::types::{RecordTypeProfile, SearchConfig};
use crate::utils::MAX_FUZZY_DISTANCE;

/// Configuration rejected before any index work starts
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from {path:?}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Profile '{record_type}' is invalid: {details}")]
    Profile { record_type: String, details: String },

    #[error("Setting '{setting}' is invalid: {details}")]
    Setting { setting: &'static str, details: String },
}

impl SearchConfig {
    /// Validate settings and every record-type profile
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.writer_threads == 0 {
            return Err(ConfigError::Setting {
                setting: "writer_threads",
                details: "must be at least 1".to_string(),
            });
        }
        if self.token_hit_limit == 0 {
            return Err(ConfigError::Setting {
                setting: "token_hit_limit",
                details: "must be at least 1".to_string(),
            });
        }
        if self.fuzzy_distance > MAX_FUZZY_DISTANCE {
            return Err(ConfigError::Setting {
                setting: "fuzzy_distance",
                details: format!(
                    "{} exceeds the supported maximum of {MAX_FUZZY_DISTANCE}",
                    self.fuzzy_distance
                ),
            });
        }
        if self.highlight_open.is_empty() || self.highlight_close.is_empty() {
            return Err(ConfigError::Setting {
                setting: "highlight markers",
                details: "opening and closing markers must be non-empty".to_string(),
            });
        }

        for (record_type, profile) in &self.profiles {
            validate_profile(record_type, profile)?;
        }
        Ok(())
    }
}

/// Validate a single profile's field lists.
///
/// A title attribute may also appear among the content attributes. Extras
/// must not overlap either the title or the content, since extras are not
/// searchable and the overlap would silently drop searchable text.
pub fn validate_profile(record_type: &str, profile: &RecordTypeProfile) -> Result<(), ConfigError> {
    let fail = |details: String| ConfigError::Profile {
        record_type: record_type.to_string(),
        details,
    };

    if record_type.trim().is_empty() {
        return Err(fail("record type name is empty".to_string()));
    }
    if profile.title_field.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(fail("title_field is empty".to_string()));
    }

    let mut content = HashSet::with_capacity(profile.content_fields.len());
    for field in &profile.content_fields {
        if field.trim().is_empty() {
            return Err(fail("content_fields contains an empty name".to_string()));
        }
        if !content.insert(field.as_str()) {
            return Err(fail(format!("content field '{field}' is listed twice")));
        }
    }

    let mut extras = HashSet::with_capacity(profile.extra_fields.len());
    for field in &profile.extra_fields {
        if field.trim().is_empty() {
            return Err(fail("extra_fields contains an empty name".to_string()));
        }
        if !extras.insert(field.as_str()) {
            return Err(fail(format!("extra field '{field}' is listed twice")));
        }
        if content.contains(field.as_str()) {
            return Err(fail(format!(
                "'{field}' is both a content field and an extra field"
            )));
        }
    }

    if extras.contains(profile.title_field()) {
        return Err(fail(format!(
            "title field '{}' is also an extra field",
            profile.title_field()
        )));
    }

    Ok(())
}
