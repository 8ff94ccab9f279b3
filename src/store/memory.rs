//! In-process record store

use anyhow::{Result, anyhow};
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{Record, RecordStore, RecordTypeMeta};

/// A [`RecordStore`] held entirely in memory.
///
/// Record types keep their registration order; records keep insertion order
/// per type, with `put` replacing a record in place.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    types: Vec<RecordTypeMeta>,
    records: BTreeMap<String, Vec<Record>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a record type's metadata
    pub fn register_type(&self, meta: RecordTypeMeta) {
        let mut inner = self.inner.write();
        match inner.types.iter().position(|t| t.name == meta.name) {
            Some(pos) => inner.types[pos] = meta,
            None => inner.types.push(meta),
        }
    }

    /// Insert or replace a record
    pub fn put(&self, record_type: &str, record: Record) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.types.iter().any(|t| t.name == record_type) {
            return Err(anyhow!("unknown record type '{record_type}'"));
        }
        let records = inner.records.entry(record_type.to_string()).or_default();
        match records.iter().position(|r| r.identity == record.identity) {
            Some(pos) => records[pos] = record,
            None => records.push(record),
        }
        Ok(())
    }

    /// Remove a record, returning it if present
    pub fn remove(&self, record_type: &str, identity: &str) -> Option<Record> {
        let mut inner = self.inner.write();
        let records = inner.records.get_mut(record_type)?;
        let pos = records.iter().position(|r| r.identity == identity)?;
        Some(records.remove(pos))
    }

    /// Fetch a full record snapshot
    #[must_use]
    pub fn get(&self, record_type: &str, identity: &str) -> Option<Record> {
        self.inner
            .read()
            .records
            .get(record_type)?
            .iter()
            .find(|r| r.identity == identity)
            .cloned()
    }
}

impl RecordStore for MemoryStore {
    fn record_types(&self) -> Result<Vec<RecordTypeMeta>> {
        Ok(self.inner.read().types.clone())
    }

    fn records(&self, record_type: &str, projection: &[&str]) -> Result<Vec<Record>> {
        let inner = self.inner.read();
        if !inner.types.iter().any(|t| t.name == record_type) {
            return Err(anyhow!("unknown record type '{record_type}'"));
        }
        Ok(inner
            .records
            .get(record_type)
            .map(|records| records.iter().map(|r| r.project(projection)).collect())
            .unwrap_or_default())
    }

    fn url_for(&self, record_type: &str, identity: &str) -> String {
        let slug = record_type.to_lowercase().replace(' ', "-");
        format!("/app/{slug}/{identity}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AttributeAccessor;

    fn note_type() -> RecordTypeMeta {
        RecordTypeMeta {
            name: "Note".to_string(),
            title_field: Some("title".to_string()),
            searchable_fields: vec!["content".to_string()],
            fields: vec!["title".to_string(), "content".to_string()],
            is_single: false,
            index_for_search: true,
        }
    }

    #[test]
    fn put_replaces_in_place() {
        let store = MemoryStore::new();
        store.register_type(note_type());
        store
            .put("Note", Record::new("N-1").with("title", "first"))
            .unwrap();
        store
            .put("Note", Record::new("N-2").with("title", "second"))
            .unwrap();
        store
            .put("Note", Record::new("N-1").with("title", "updated"))
            .unwrap();

        let records = store.records("Note", &["title"]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity, "N-1");
        assert_eq!(records[0].attribute("title").unwrap().to_string(), "updated");
    }

    #[test]
    fn projection_drops_unrequested_attributes() {
        let store = MemoryStore::new();
        store.register_type(note_type());
        store
            .put(
                "Note",
                Record::new("N-1").with("title", "t").with("content", "c"),
            )
            .unwrap();

        let records = store.records("Note", &["content"]).unwrap();
        assert!(records[0].attribute("title").is_none());
        assert_eq!(records[0].attribute("name").unwrap().to_string(), "N-1");
    }

    #[test]
    fn get_returns_full_snapshot_until_removed() {
        let store = MemoryStore::new();
        store.register_type(note_type());
        store
            .put(
                "Note",
                Record::new("N-1").with("title", "t").with("content", "c"),
            )
            .unwrap();

        let record = store.get("Note", "N-1").unwrap();
        assert_eq!(record.attribute("content").unwrap().to_string(), "c");
        assert!(store.get("Note", "N-2").is_none());

        assert!(store.remove("Note", "N-1").is_some());
        assert!(store.get("Note", "N-1").is_none());
    }

    #[test]
    fn unknown_type_is_an_error() {
        let store = MemoryStore::new();
        assert!(store.put("Ghost", Record::new("G-1")).is_err());
        assert!(store.records("Ghost", &[]).is_err());
    }

    #[test]
    fn url_uses_slugged_type() {
        let store = MemoryStore::new();
        assert_eq!(store.url_for("Sales Order", "SO-1"), "/app/sales-order/SO-1");
    }
}
