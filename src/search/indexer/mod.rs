//! Index synchronization with the record store
//!
//! This module keeps the index aligned with the record store: a full rebuild
//! re-enumerates every eligible record type, and an upsert replaces the
//! document of a single changed record.

mod mapper;

pub use mapper::{
    ProfileSource, ResolvedProfile, build_document, check_attributes, discover_profile,
    is_discoverable, to_tantivy,
};

use std::sync::Arc;
use std::time::Instant;
use tantivy::{IndexWriter, Term};

use super::engine::SearchEngine;
use super::errors::{SearchError, SearchResult};
use super::types::IndexedDocument;
use crate::config::SearchConfig;
use crate::store::{AttributeAccessor, RecordStore, RecordTypeMeta};

/// Writes store records into the index
#[derive(Clone)]
pub struct IndexSynchronizer {
    engine: SearchEngine,
    config: Arc<SearchConfig>,
    store: Arc<dyn RecordStore>,
}

impl IndexSynchronizer {
    #[must_use]
    pub fn new(engine: SearchEngine, config: Arc<SearchConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            engine,
            config,
            store,
        }
    }

    /// Clear the index and re-index every eligible record type.
    ///
    /// Profiles are resolved and checked against the store before anything is
    /// deleted. Each record type is committed on its own; if a later type
    /// fails, earlier types stay committed and the failing type's uncommitted
    /// documents are discarded. The rebuild must then be re-run.
    pub fn rebuild(&self, auto_discover: bool) -> SearchResult<usize> {
        let start = Instant::now();
        let metas = self.store.record_types().map_err(SearchError::store)?;
        let plan = self.plan_rebuild(&metas, auto_discover)?;

        let mut writer = self.engine.lock_writer();

        writer
            .delete_all_documents()
            .map_err(|e| SearchError::write("<all>", e))?;
        self.engine.commit(&mut writer, "<all>")?;

        let mut total = 0usize;
        for resolved in &plan {
            match self.index_record_type(&mut writer, resolved) {
                Ok(count) => {
                    tracing::debug!(
                        record_type = %resolved.record_type,
                        source = ?resolved.source,
                        records = count,
                        "Record type indexed"
                    );
                    total += count;
                }
                Err(e) => {
                    tracing::error!(
                        record_type = %resolved.record_type,
                        indexed_before_failure = total,
                        error = %e,
                        "Rebuild aborted; index is partial until rebuilt"
                    );
                    if let Err(rollback_error) = writer.rollback() {
                        tracing::error!(error = %rollback_error, "Rollback after failed rebuild step failed");
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(
            records = total,
            record_types = plan.len(),
            auto_discover,
            duration_ms = start.elapsed().as_millis(),
            "Index rebuild completed"
        );
        Ok(total)
    }

    /// Decide which record types a rebuild indexes, and with which profile.
    ///
    /// With `auto_discover`, every type must pass the deny-list and the
    /// eligibility check, configured or not; a configured profile still
    /// decides the fields.
    fn plan_rebuild(
        &self,
        metas: &[RecordTypeMeta],
        auto_discover: bool,
    ) -> SearchResult<Vec<ResolvedProfile>> {
        let mut plan = Vec::new();

        for meta in metas {
            if auto_discover && self.config.is_excluded(&meta.name) {
                tracing::warn!(record_type = %meta.name, "Skipping excluded record type");
                continue;
            }
            if auto_discover && !is_discoverable(meta) {
                tracing::warn!(
                    record_type = %meta.name,
                    is_single = meta.is_single,
                    index_for_search = meta.index_for_search,
                    "Skipping record type not eligible for search"
                );
                continue;
            }

            let resolved = match self.config.profile(&meta.name) {
                Some(profile) => ResolvedProfile {
                    record_type: meta.name.clone(),
                    profile: profile.clone(),
                    source: ProfileSource::Configured,
                },
                None if auto_discover => ResolvedProfile {
                    record_type: meta.name.clone(),
                    profile: discover_profile(meta),
                    source: ProfileSource::Discovered,
                },
                None => {
                    tracing::warn!(record_type = %meta.name, "Skipping record type without profile");
                    continue;
                }
            };

            check_attributes(&resolved, meta)?;
            plan.push(resolved);
        }

        for record_type in self.config.profiles().keys() {
            if !metas.iter().any(|m| &m.name == record_type) {
                tracing::warn!(
                    record_type = %record_type,
                    "Configured record type is unknown to the store; not indexed"
                );
            }
        }

        Ok(plan)
    }

    fn index_record_type(
        &self,
        writer: &mut IndexWriter,
        resolved: &ResolvedProfile,
    ) -> SearchResult<usize> {
        let projection = resolved.profile.projection();
        let records = self
            .store
            .records(&resolved.record_type, &projection)
            .map_err(SearchError::store)?;

        let schema = self.engine.schema();
        for record in &records {
            let doc = build_document(&resolved.record_type, &resolved.profile, record);
            let tantivy_doc = to_tantivy(schema, &doc)?;
            writer
                .add_document(tantivy_doc)
                .map_err(|e| SearchError::write(&doc.id, e))?;
        }

        self.engine.commit(writer, &resolved.record_type)?;
        Ok(records.len())
    }

    /// Resolve the profile a change notification for `record_type` uses.
    ///
    /// `None` when the type is not indexed: no configured profile and either
    /// auto-discovery is off or the store's metadata rules the type out.
    pub fn resolve_profile(&self, record_type: &str) -> SearchResult<Option<ResolvedProfile>> {
        let configured = self.config.profile(record_type);
        if configured.is_none() && !self.config.auto_discover() {
            return Ok(None);
        }

        let metas = self.store.record_types().map_err(SearchError::store)?;
        let meta = metas.iter().find(|m| m.name == record_type);

        let resolved = match (configured, meta) {
            (Some(profile), meta) => {
                let resolved = ResolvedProfile {
                    record_type: record_type.to_string(),
                    profile: profile.clone(),
                    source: ProfileSource::Configured,
                };
                if let Some(meta) = meta {
                    check_attributes(&resolved, meta)?;
                }
                resolved
            }
            (None, Some(meta))
                if is_discoverable(meta) && !self.config.is_excluded(record_type) =>
            {
                ResolvedProfile {
                    record_type: record_type.to_string(),
                    profile: discover_profile(meta),
                    source: ProfileSource::Discovered,
                }
            }
            (None, _) => return Ok(None),
        };

        Ok(Some(resolved))
    }

    /// Replace the document of one changed record.
    ///
    /// Returns `false` without touching the index when the record type is not
    /// indexed. The delete of the old document and the add of the new one are
    /// committed together, so readers see either the old or the new version.
    pub fn upsert(&self, record_type: &str, record: &dyn AttributeAccessor) -> SearchResult<bool> {
        let Some(resolved) = self.resolve_profile(record_type)? else {
            tracing::debug!(record_type, identity = record.identity(), "Record type not indexed");
            return Ok(false);
        };

        let doc = build_document(record_type, &resolved.profile, record);
        let tantivy_doc = to_tantivy(self.engine.schema(), &doc)?;

        let mut writer = self.engine.lock_writer();
        writer.delete_term(self.id_term(&doc.id));
        if let Err(e) = writer.add_document(tantivy_doc) {
            // Do not leave the delete pending for the next commit
            if let Err(rollback_error) = writer.rollback() {
                tracing::error!(id = %doc.id, error = %rollback_error, "Rollback after failed add failed");
            }
            return Err(SearchError::write(&doc.id, e));
        }
        self.engine.commit(&mut writer, &doc.id)?;

        tracing::debug!(id = %doc.id, source = ?resolved.source, "Record indexed");
        Ok(true)
    }

    /// Delete the document of one record, if indexed
    pub fn remove(&self, record_type: &str, identity: &str) -> SearchResult<()> {
        let id = IndexedDocument::document_id(record_type, identity);
        let mut writer = self.engine.lock_writer();
        writer.delete_term(self.id_term(&id));
        self.engine.commit(&mut writer, &id)?;
        tracing::debug!(id = %id, "Record removed from index");
        Ok(())
    }

    fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.engine.schema().id, id)
    }
}
