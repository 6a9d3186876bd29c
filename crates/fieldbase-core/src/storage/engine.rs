//! sled-backed persistence.

use super::{Namespace, Persistence, StoreConfig};
use crate::error::Error;
use sled::{Db, Tree};

/// Tree name for all namespaced records.
const RECORDS_TREE: &str = "records";

/// Persistence over a single sled tree, one key prefix per namespace.
pub struct SledPersistence {
    /// The underlying sled database.
    db: Db,

    /// Tree holding every record.
    records: Tree,
}

impl SledPersistence {
    /// Open or create a store with the given configuration.
    pub fn open(config: &StoreConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        Self::from_db(db)
    }

    /// Use an already opened sled database.
    pub fn from_db(db: Db) -> Result<Self, Error> {
        let records = db.open_tree(RECORDS_TREE)?;
        Ok(Self { db, records })
    }

    /// Check if the database was recovered from a previous crash.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Get database size in bytes.
    pub fn size_on_disk(&self) -> Result<u64, Error> {
        Ok(self.db.size_on_disk()?)
    }
}

impl Persistence for SledPersistence {
    fn write(&self, namespace: Namespace, id: &str, bytes: &[u8]) -> Result<(), Error> {
        self.records.insert(namespace.key(id).as_bytes(), bytes)?;
        Ok(())
    }

    fn read(&self, namespace: Namespace, id: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self
            .records
            .get(namespace.key(id).as_bytes())?
            .map(|bytes| bytes.to_vec()))
    }

    fn remove(&self, namespace: Namespace, id: &str) -> Result<(), Error> {
        self.records.remove(namespace.key(id).as_bytes())?;
        Ok(())
    }

    fn scan(&self, namespace: Namespace) -> Result<Vec<(String, Vec<u8>)>, Error> {
        let mut rows = Vec::new();
        for result in self.records.scan_prefix(namespace.prefix().as_bytes()) {
            let (key, value) = result?;
            let key = std::str::from_utf8(&key)
                .map_err(|e| Error::Deserialization(format!("record key: {}", e)))?;
            if let Some(id) = namespace.decode(key) {
                rows.push((id.to_string(), value.to_vec()));
            }
        }
        Ok(rows)
    }

    fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SledPersistence {
        SledPersistence::open(&StoreConfig::temporary()).unwrap()
    }

    #[test]
    fn test_write_read_remove() {
        let store = test_store();
        store.write(Namespace::Deals, "d1", b"{}").unwrap();

        assert_eq!(store.read(Namespace::Deals, "d1").unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.read(Namespace::DealValues, "d1").unwrap(), None);

        store.remove(Namespace::Deals, "d1").unwrap();
        assert_eq!(store.read(Namespace::Deals, "d1").unwrap(), None);
        store.remove(Namespace::Deals, "d1").unwrap();
    }

    #[test]
    fn test_scan_is_namespace_scoped() {
        let store = test_store();
        store.write(Namespace::Catalogs, "b", b"2").unwrap();
        store.write(Namespace::Catalogs, "a", b"1").unwrap();
        store.write(Namespace::CatalogEntries, "a", b"x").unwrap();

        let rows = store.scan(Namespace::Catalogs).unwrap();
        assert_eq!(
            rows,
            vec![("a".to_string(), b"1".to_vec()), ("b".to_string(), b"2".to_vec())]
        );
        assert_eq!(store.scan(Namespace::CatalogEntries).unwrap().len(), 1);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path());

        {
            let store = SledPersistence::open(&config).unwrap();
            store.write(Namespace::FieldDefinitions, "f1", b"{}").unwrap();
            store.flush().unwrap();
        }

        {
            let store = SledPersistence::open(&config).unwrap();
            assert!(store.read(Namespace::FieldDefinitions, "f1").unwrap().is_some());
        }
    }
}
