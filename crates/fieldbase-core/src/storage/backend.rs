//! Persistence backend abstraction.

use super::Namespace;
use crate::error::Error;

/// A key-value backend holding JSON records grouped by namespace.
///
/// Stores treat every call as fire-and-forget: failures are logged by the
/// caller and never roll back in-memory state.
pub trait Persistence: Send + Sync {
    /// Write (insert or replace) a record.
    fn write(&self, namespace: Namespace, id: &str, bytes: &[u8]) -> Result<(), Error>;

    /// Read a single record.
    fn read(&self, namespace: Namespace, id: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Remove a record. Removing a missing record is not an error.
    fn remove(&self, namespace: Namespace, id: &str) -> Result<(), Error>;

    /// All records of a namespace as `(id, bytes)`, ordered by id.
    fn scan(&self, namespace: Namespace) -> Result<Vec<(String, Vec<u8>)>, Error>;

    /// Flush pending writes.
    fn flush(&self) -> Result<(), Error>;
}
