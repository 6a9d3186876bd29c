//! Lookup from deal id to deal record.

use crate::storage::{record, Namespace, Persistence};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

/// Resolves deal ids to deal records.
///
/// The deal shape belongs to the deals collaborator; the scanner only hands
/// records back.
pub trait DealDirectory {
    /// The deal record type.
    type Deal;

    /// Look up a deal.
    fn deal(&self, deal_id: &str) -> Option<Self::Deal>;
}

impl<D: Clone> DealDirectory for HashMap<String, D> {
    type Deal = D;

    fn deal(&self, deal_id: &str) -> Option<D> {
        self.get(deal_id).cloned()
    }
}

impl<D: Clone> DealDirectory for BTreeMap<String, D> {
    type Deal = D;

    fn deal(&self, deal_id: &str) -> Option<D> {
        self.get(deal_id).cloned()
    }
}

/// A deal as persisted by the deals collaborator: an id plus an opaque JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRecord {
    /// Deal id.
    pub id: String,
    /// Everything else about the deal.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl DealRecord {
    /// Create a record.
    pub fn new(id: impl Into<String>, body: serde_json::Value) -> Self {
        Self { id: id.into(), body }
    }

    /// A short label: the body's `title` or `name`, else the id.
    pub fn label(&self) -> &str {
        ["title", "name"]
            .iter()
            .find_map(|key| self.body.get(key).and_then(serde_json::Value::as_str))
            .unwrap_or(&self.id)
    }
}

/// Deal records persisted under [`Namespace::Deals`].
#[derive(Clone)]
pub struct PersistedDeals {
    persistence: Arc<dyn Persistence>,
}

impl PersistedDeals {
    /// Create a directory over a backend.
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    /// Store a deal record.
    pub fn put(&self, deal: &DealRecord) {
        record::persist(&*self.persistence, Namespace::Deals, &deal.id, deal);
    }

    /// Remove a deal record.
    pub fn remove(&self, deal_id: &str) {
        record::unpersist(&*self.persistence, Namespace::Deals, deal_id);
    }

    /// Every readable deal record.
    pub fn all(&self) -> Vec<DealRecord> {
        record::load_all(&*self.persistence, Namespace::Deals)
    }
}

impl DealDirectory for PersistedDeals {
    type Deal = DealRecord;

    fn deal(&self, deal_id: &str) -> Option<DealRecord> {
        let bytes = match self.persistence.read(Namespace::Deals, deal_id) {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!(deal_id, error = %e, "failed to read deal record");
                return None;
            }
        };
        match record::from_bytes(&bytes) {
            Ok(deal) => Some(deal),
            Err(e) => {
                warn!(deal_id, error = %e, "skipping malformed deal record");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPersistence;
    use serde_json::json;

    #[test]
    fn test_persisted_lookup() {
        let persistence = Arc::new(MemoryPersistence::new());
        let deals = PersistedDeals::new(persistence.clone());
        deals.put(&DealRecord::new("d1", json!({"title": "Big order"})));
        persistence.write(Namespace::Deals, "d2", b"garbage").unwrap();

        assert_eq!(deals.deal("d1").unwrap().label(), "Big order");
        assert!(deals.deal("d2").is_none());
        assert!(deals.deal("d3").is_none());
        assert_eq!(deals.all().len(), 1);
    }

    #[test]
    fn test_label_falls_back_to_id() {
        assert_eq!(DealRecord::new("d1", json!({"amount": 5})).label(), "d1");
        assert_eq!(DealRecord::new("d1", json!({"name": "N"})).label(), "N");
    }
}
