//! Record store contract
//!
//! The search layer never owns record data. It enumerates record types and
//! their records through [`RecordStore`], and reads single changed records
//! through [`AttributeAccessor`].

mod memory;
mod value;

pub use memory::MemoryStore;
pub use value::FieldValue;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::IDENTITY_FIELD;

/// Store-side metadata describing one record type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordTypeMeta {
    pub name: String,
    /// Attribute the store displays as the record title, if any
    pub title_field: Option<String>,
    /// Attributes flagged as searchable by the store
    pub searchable_fields: Vec<String>,
    /// Every attribute the record type declares
    pub fields: Vec<String>,
    /// At most one record of this type exists
    pub is_single: bool,
    /// Type opted in to web/search indexing
    pub index_for_search: bool,
}

impl RecordTypeMeta {
    /// Check whether `attribute` can be read from records of this type.
    ///
    /// The identity attribute is always readable.
    #[must_use]
    pub fn has_attribute(&self, attribute: &str) -> bool {
        attribute == IDENTITY_FIELD || self.fields.iter().any(|f| f == attribute)
    }
}

/// Read access to one record's attributes
pub trait AttributeAccessor {
    /// Identity of the record within its type
    fn identity(&self) -> &str;

    /// Value of a named attribute, `None` if the record has no such attribute
    fn attribute(&self, name: &str) -> Option<FieldValue>;
}

/// Owned snapshot of a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub identity: String,
    pub attributes: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Copy only the projected attributes
    #[must_use]
    pub fn project(&self, projection: &[&str]) -> Record {
        let attributes = projection
            .iter()
            .filter_map(|name| {
                self.attributes
                    .get(*name)
                    .map(|value| ((*name).to_string(), value.clone()))
            })
            .collect();
        Record {
            identity: self.identity.clone(),
            attributes,
        }
    }
}

impl AttributeAccessor for Record {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn attribute(&self, name: &str) -> Option<FieldValue> {
        match self.attributes.get(name) {
            Some(value) => Some(value.clone()),
            None if name == IDENTITY_FIELD => Some(FieldValue::Text(self.identity.clone())),
            None => None,
        }
    }
}

/// The external record repository being indexed
pub trait RecordStore: Send + Sync {
    /// Every record type known to the store, with metadata
    fn record_types(&self) -> Result<Vec<RecordTypeMeta>>;

    /// Every record of `record_type`, carrying at least the projected attributes
    fn records(&self, record_type: &str, projection: &[&str]) -> Result<Vec<Record>>;

    /// Canonical external link for a record
    fn url_for(&self, record_type: &str, identity: &str) -> String;
}
