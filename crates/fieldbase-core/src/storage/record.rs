//! JSON record encoding and fire-and-forget persistence helpers.

use super::{Namespace, Persistence};
use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Serialize a record to JSON bytes.
pub fn to_bytes<T: Serialize>(record: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(record).map_err(|e| Error::Serialization(e.to_string()))
}

/// Deserialize a record from JSON bytes.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
}

/// Write a record, logging instead of failing.
///
/// In-memory state is the source of truth for the session; a failed write
/// only costs durability.
pub fn persist<T: Serialize>(backend: &dyn Persistence, namespace: Namespace, id: &str, record: &T) {
    let result = to_bytes(record).and_then(|bytes| backend.write(namespace, id, &bytes));
    if let Err(e) = result {
        warn!(namespace = %namespace, id, error = %e, "failed to persist record");
    }
}

/// Remove a record, logging instead of failing.
pub fn unpersist(backend: &dyn Persistence, namespace: Namespace, id: &str) {
    if let Err(e) = backend.remove(namespace, id) {
        warn!(namespace = %namespace, id, error = %e, "failed to remove persisted record");
    }
}

/// Load every record of a namespace.
///
/// Malformed records are skipped and logged; a failed scan yields nothing.
pub fn load_all<T: DeserializeOwned>(backend: &dyn Persistence, namespace: Namespace) -> Vec<T> {
    let rows = match backend.scan(namespace) {
        Ok(rows) => rows,
        Err(e) => {
            warn!(namespace = %namespace, error = %e, "failed to scan persisted records");
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for (id, bytes) in rows {
        match from_bytes::<T>(&bytes) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(namespace = %namespace, id = %id, error = %e, "skipping malformed record");
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPersistence;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: String,
        n: u32,
    }

    #[test]
    fn test_load_skips_malformed() {
        let backend = MemoryPersistence::new();
        persist(&backend, Namespace::Deals, "a", &Sample { id: "a".into(), n: 1 });
        backend.write(Namespace::Deals, "b", b"{not json").unwrap();
        persist(&backend, Namespace::Deals, "c", &Sample { id: "c".into(), n: 3 });

        let loaded: Vec<Sample> = load_all(&backend, Namespace::Deals);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
        assert_eq!(loaded[1].id, "c");
    }

    #[test]
    fn test_persist_failure_is_swallowed() {
        let backend = MemoryPersistence::new();
        backend.set_failing(true);
        persist(&backend, Namespace::Deals, "a", &Sample { id: "a".into(), n: 1 });
        unpersist(&backend, Namespace::Deals, "a");

        let loaded: Vec<Sample> = load_all(&backend, Namespace::Deals);
        assert!(loaded.is_empty());

        backend.set_failing(false);
        assert!(backend.scan(Namespace::Deals).unwrap().is_empty());
    }
}
