//! Record-store boundary used by the enrichment engine.
//!
//! The engine only reads records, writes field sets and maintains attributes;
//! it never creates or deletes records. [`SqliteStore`] shares one
//! [`CatalogDb`] connection behind a mutex. Methods are synchronous so a lock
//! guard can never live across an `.await`.


use parking_lot::Mutex;

use crate::db::{Attribute, AttributeKind, CatalogDb, NewRecord, Record, StoreError, UpdateSet};
use crate::types::EnrichConfig;

pub trait RecordStore: Send + Sync {
    fn find_by_id(&self, id: i64) -> Result<Option<Record>, StoreError>;

    /// Apply field writes; returns the record as stored afterwards.
    fn update(&self, id: i64, updates: &UpdateSet) -> Result<Record, StoreError>;

    fn list_attributes(&self, record_id: i64) -> Result<Vec<Attribute>, StoreError>;

    fn create_attribute(
        &self,
        record_id: i64,
        name: &str,
        kind: AttributeKind,
        value: &str,
    ) -> Result<Attribute, StoreError>;

    fn update_attribute(&self, attribute_id: i64, value: &str) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    db: Mutex<CatalogDb>,
}

impl SqliteStore {
    pub fn new(db: CatalogDb) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open(config: &EnrichConfig) -> Result<Self, StoreError> {
        CatalogDb::open(config).map(Self::new)
    }

    /// Seed a record. Not part of [`RecordStore`]: enrichment never creates records.
    pub fn insert_record(&self, record: &NewRecord) -> Result<Record, StoreError> {
        self.db.lock().insert_record(record)
    }

    pub fn find_by_external_id(&self, external_id: &str) -> Result<Option<Record>, StoreError> {
        self.db.lock().get_record_by_external_id(external_id)
    }

    pub fn list_record_ids(&self) -> Result<Vec<i64>, StoreError> {
        self.db.lock().list_record_ids()
    }
}

impl RecordStore for SqliteStore {
    fn find_by_id(&self, id: i64) -> Result<Option<Record>, StoreError> {
        self.db.lock().get_record(id)
    }

    fn update(&self, id: i64, updates: &UpdateSet) -> Result<Record, StoreError> {
        let db = self.db.lock();
        db.with_transaction(|tx| tx.update_record(id, updates))
    }

    fn list_attributes(&self, record_id: i64) -> Result<Vec<Attribute>, StoreError> {
        self.db.lock().list_attributes(record_id)
    }

    fn create_attribute(
        &self,
        record_id: i64,
        name: &str,
        kind: AttributeKind,
        value: &str,
    ) -> Result<Attribute, StoreError> {
        self.db.lock().create_attribute(record_id, name, kind, value)
    }

    fn update_attribute(&self, attribute_id: i64, value: &str) -> Result<(), StoreError> {
        self.db.lock().update_attribute(attribute_id, value)
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::SqliteStore;
    use crate::db::test_utils::test_db;

    pub fn test_store() -> SqliteStore {
        SqliteStore::new(test_db())
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::test_store;
    use super::*;
    use crate::db::RecordField;

    #[test]
    fn test_store_round_trip_through_trait() {
        let store = test_store();
        let record = store.insert_record(&NewRecord::new("SKU-1", "Drill")).unwrap();
        let dyn_store: &dyn RecordStore = &store;

        let mut set = UpdateSet::new();
        set.insert(RecordField::Description, "Fúró".into());
        dyn_store.update(record.id, &set).unwrap();

        let loaded = dyn_store.find_by_id(record.id).unwrap().unwrap();
        assert_eq!(loaded.description.as_deref(), Some("Fúró"));
        assert!(dyn_store.find_by_id(record.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_find_by_external_id() {
        let store = test_store();
        let record = store.insert_record(&NewRecord::new("SKU-7", "Saw")).unwrap();

        let found = store.find_by_external_id("SKU-7").unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert!(store.find_by_external_id("SKU-8").unwrap().is_none());
    }
}
