//! Field mapping from store records to index documents

use std::collections::BTreeMap;
use tantivy::TantivyDocument;

use crate::config::RecordTypeProfile;
use crate::search::errors::{SearchError, SearchResult};
use crate::search::schema::SearchSchema;
use crate::search::types::IndexedDocument;
use crate::store::{AttributeAccessor, FieldValue, RecordTypeMeta};
use crate::utils::{CONTENT_SEPARATOR, IDENTITY_FIELD};

/// Where a record type's profile came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Configured,
    Discovered,
}

/// Profile in effect for one record type during an index operation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub record_type: String,
    pub profile: RecordTypeProfile,
    pub source: ProfileSource,
}

/// Infer a profile from store metadata.
///
/// Title is the type's display field (identity when unset); content is every
/// searchable attribute except the title; nothing is carried as extras.
#[must_use]
pub fn discover_profile(meta: &RecordTypeMeta) -> RecordTypeProfile {
    let title = meta
        .title_field
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(IDENTITY_FIELD);

    RecordTypeProfile {
        title_field: (title != IDENTITY_FIELD).then(|| title.to_string()),
        content_fields: meta
            .searchable_fields
            .iter()
            .filter(|f| f.as_str() != title)
            .cloned()
            .collect(),
        extra_fields: Vec::new(),
    }
}

/// Auto-discovered types must opt in to search and hold more than one record
#[must_use]
pub fn is_discoverable(meta: &RecordTypeMeta) -> bool {
    meta.index_for_search && !meta.is_single
}

/// Reject a profile naming an attribute the record type does not declare
pub fn check_attributes(resolved: &ResolvedProfile, meta: &RecordTypeMeta) -> SearchResult<()> {
    match resolved
        .profile
        .projection()
        .into_iter()
        .find(|attribute| !meta.has_attribute(attribute))
    {
        Some(missing) => Err(SearchError::Configuration(format!(
            "profile for '{}' references unknown attribute '{missing}'",
            resolved.record_type
        ))),
        None => Ok(()),
    }
}

/// Build the index document for one record
#[must_use]
pub fn build_document(
    record_type: &str,
    profile: &RecordTypeProfile,
    record: &dyn AttributeAccessor,
) -> IndexedDocument {
    let read = |name: &str| record.attribute(name).unwrap_or_default();

    let title = read(profile.title_field()).to_string();

    let content = profile
        .content_fields
        .iter()
        .map(|field| read(field).to_string())
        .collect::<Vec<_>>()
        .join(CONTENT_SEPARATOR);

    let extras: BTreeMap<String, FieldValue> = profile
        .extra_fields
        .iter()
        .map(|field| (field.clone(), read(field)))
        .collect();

    let identity = record.identity();
    let name = if identity.is_empty() {
        title.clone()
    } else {
        identity.to_string()
    };

    IndexedDocument {
        id: IndexedDocument::document_id(record_type, identity),
        name,
        title,
        content,
        doctype: record_type.to_string(),
        extras,
    }
}

/// Convert to the engine's document representation
pub fn to_tantivy(schema: &SearchSchema, doc: &IndexedDocument) -> SearchResult<TantivyDocument> {
    let extras = serde_json::to_string(&doc.extras)
        .map_err(|e| SearchError::write(&doc.id, format!("failed to encode extras: {e}")))?;

    let mut tantivy_doc = TantivyDocument::default();
    tantivy_doc.add_text(schema.id, &doc.id);
    tantivy_doc.add_text(schema.name, &doc.name);
    tantivy_doc.add_text(schema.title, &doc.title);
    tantivy_doc.add_text(schema.content, &doc.content);
    tantivy_doc.add_text(schema.doctype, &doc.doctype);
    tantivy_doc.add_text(schema.extras, &extras);
    Ok(tantivy_doc)
}
