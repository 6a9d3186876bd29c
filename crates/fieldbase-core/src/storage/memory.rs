//! In-memory persistence for tests and throwaway sessions.

use super::{Namespace, Persistence};
use crate::error::Error;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Persistence held in a `BTreeMap`.
///
/// Can be switched into a failing mode where every call errors, to exercise
/// the paths that must keep working when persistence is unavailable.
#[derive(Default)]
pub struct MemoryPersistence {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryPersistence {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored records across all namespaces.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn check(&self) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::PersistenceUnavailable("memory store set to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl Persistence for MemoryPersistence {
    fn write(&self, namespace: Namespace, id: &str, bytes: &[u8]) -> Result<(), Error> {
        self.check()?;
        self.records.lock().insert(namespace.key(id), bytes.to_vec());
        Ok(())
    }

    fn read(&self, namespace: Namespace, id: &str) -> Result<Option<Vec<u8>>, Error> {
        self.check()?;
        Ok(self.records.lock().get(&namespace.key(id)).cloned())
    }

    fn remove(&self, namespace: Namespace, id: &str) -> Result<(), Error> {
        self.check()?;
        self.records.lock().remove(&namespace.key(id));
        Ok(())
    }

    fn scan(&self, namespace: Namespace) -> Result<Vec<(String, Vec<u8>)>, Error> {
        self.check()?;
        let records = self.records.lock();
        Ok(records
            .range(namespace.prefix().to_string()..)
            .take_while(|(key, _)| key.starts_with(namespace.prefix()))
            .filter_map(|(key, bytes)| {
                namespace
                    .decode(key)
                    .map(|id| (id.to_string(), bytes.clone()))
            })
            .collect())
    }

    fn flush(&self) -> Result<(), Error> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_prefix() {
        let store = MemoryPersistence::new();
        store.write(Namespace::Deals, "2", b"b").unwrap();
        store.write(Namespace::Deals, "1", b"a").unwrap();
        store.write(Namespace::DealValues, "1", b"c").unwrap();

        let rows = store.scan(Namespace::Deals).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "1");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_failing_mode() {
        let store = MemoryPersistence::new();
        store.set_failing(true);
        assert!(matches!(
            store.write(Namespace::Deals, "1", b"a"),
            Err(Error::PersistenceUnavailable(_))
        ));
        store.set_failing(false);
        assert!(store.is_empty());
    }
}
