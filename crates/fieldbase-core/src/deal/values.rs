//! Per-deal ad-hoc value maps.
//!
//! Deals attach loosely typed `{field id -> value}` maps, one persisted record
//! per deal. Nothing declares which values are entry ids; a value references
//! an entry only by happening to equal its id.

use crate::error::Error;
use crate::storage::{record, Namespace, Persistence};
use crate::value::{Value, ValueMap};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// The value map of one deal.
#[derive(Debug, Clone, PartialEq)]
pub struct DealValues {
    /// Deal id the map is keyed by.
    pub deal_id: String,
    /// Field values.
    pub values: ValueMap,
}

/// Read-only enumeration of every deal value map.
pub trait DealValueSource {
    /// Every map, in a stable order. Unreadable maps come back empty.
    fn deal_value_maps(&self) -> Vec<DealValues>;
}

impl DealValueSource for BTreeMap<String, ValueMap> {
    fn deal_value_maps(&self) -> Vec<DealValues> {
        self.iter()
            .map(|(deal_id, values)| DealValues {
                deal_id: deal_id.clone(),
                values: values.clone(),
            })
            .collect()
    }
}

impl DealValueSource for HashMap<String, ValueMap> {
    fn deal_value_maps(&self) -> Vec<DealValues> {
        let mut maps: Vec<DealValues> = self
            .iter()
            .map(|(deal_id, values)| DealValues {
                deal_id: deal_id.clone(),
                values: values.clone(),
            })
            .collect();
        maps.sort_by(|a, b| a.deal_id.cmp(&b.deal_id));
        maps
    }
}

/// Outcome of dropping a field from every deal value map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldPurge {
    /// Maps that held the field and were rewritten.
    pub updated: usize,
    /// Malformed maps left untouched.
    pub skipped: usize,
}

/// Deal value maps persisted under [`Namespace::DealValues`].
///
/// Maps are read from persistence on every enumeration; there is no cache and
/// no reverse index.
#[derive(Clone)]
pub struct DealValueStore {
    persistence: Arc<dyn Persistence>,
}

impl DealValueStore {
    /// Create a store over a backend.
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    /// Replace a deal's value map.
    pub fn set_values(&self, deal_id: &str, values: &ValueMap) {
        record::persist(&*self.persistence, Namespace::DealValues, deal_id, values);
    }

    /// Set one value on a deal's map.
    pub fn set_value(&self, deal_id: &str, field_id: &str, value: Value) {
        let mut values = self.values(deal_id);
        values.insert(field_id.to_string(), value);
        self.set_values(deal_id, &values);
    }

    /// A deal's value map; empty when absent or unreadable.
    pub fn values(&self, deal_id: &str) -> ValueMap {
        match self.persistence.read(Namespace::DealValues, deal_id) {
            Ok(Some(bytes)) => parse_value_map(&bytes).unwrap_or_else(|e| {
                warn!(deal_id, error = %e, "treating malformed deal value map as empty");
                ValueMap::new()
            }),
            Ok(None) => ValueMap::new(),
            Err(e) => {
                warn!(deal_id, error = %e, "failed to read deal value map");
                ValueMap::new()
            }
        }
    }

    /// Drop a deal's value map.
    pub fn remove(&self, deal_id: &str) {
        record::unpersist(&*self.persistence, Namespace::DealValues, deal_id);
    }

    /// Remove a field from every map that holds it.
    ///
    /// Malformed maps are skipped and counted. Values under other keys,
    /// including ones this crate cannot interpret, are written back as read.
    pub fn remove_field(&self, field_id: &str) -> FieldPurge {
        let mut purge = FieldPurge::default();
        for (deal_id, bytes) in self.scan_raw() {
            let mut object = match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(serde_json::Value::Object(object)) => object,
                Ok(_) | Err(_) => {
                    warn!(deal_id = %deal_id, field_id, "skipping malformed deal value map");
                    purge.skipped += 1;
                    continue;
                }
            };
            if object.remove(field_id).is_some() {
                record::persist(&*self.persistence, Namespace::DealValues, &deal_id, &object);
                purge.updated += 1;
            }
        }
        debug!(field_id, updated = purge.updated, skipped = purge.skipped, "purged deal values");
        purge
    }

    fn scan_raw(&self) -> Vec<(String, Vec<u8>)> {
        self.persistence
            .scan(Namespace::DealValues)
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to scan deal value maps");
                Vec::new()
            })
    }
}

impl DealValueSource for DealValueStore {
    fn deal_value_maps(&self) -> Vec<DealValues> {
        self.scan_raw()
            .into_iter()
            .map(|(deal_id, bytes)| {
                let values = parse_value_map(&bytes).unwrap_or_else(|e| {
                    warn!(deal_id = %deal_id, error = %e, "treating malformed deal value map as empty");
                    ValueMap::new()
                });
                DealValues { deal_id, values }
            })
            .collect()
    }
}

/// Parse a persisted value map. Anything but a JSON object is malformed.
pub fn parse_value_map(bytes: &[u8]) -> Result<ValueMap, Error> {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(serde_json::Value::Object(object)) => Ok(object
            .into_iter()
            .map(|(field_id, json)| (field_id, Value::from_json(json)))
            .collect()),
        Ok(other) => Err(Error::Deserialization(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(Error::Deserialization(e.to_string())),
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPersistence;

    fn store() -> (Arc<MemoryPersistence>, DealValueStore) {
        let persistence = Arc::new(MemoryPersistence::new());
        (persistence.clone(), DealValueStore::new(persistence))
    }

    #[test]
    fn test_set_and_read() {
        let (_, deals) = store();
        deals.set_value("d1", "contact", Value::text("p1"));
        deals.set_value("d1", "stage", Value::text("won"));

        let values = deals.values("d1");
        assert_eq!(values["contact"], Value::text("p1"));
        assert_eq!(values.len(), 2);
        assert!(deals.values("d2").is_empty());
    }

    #[test]
    fn test_malformed_map_reads_empty() {
        let (persistence, deals) = store();
        persistence.write(Namespace::DealValues, "bad", b"[1, 2]").unwrap();
        persistence.write(Namespace::DealValues, "worse", b"{nope").unwrap();
        deals.set_value("good", "contact", Value::text("p1"));

        let maps = deals.deal_value_maps();
        assert_eq!(maps.len(), 3);
        let good = maps.iter().find(|m| m.deal_id == "good").unwrap();
        assert!(good.values.contains_key("contact"));
        assert!(maps.iter().filter(|m| m.deal_id != "good").all(|m| m.values.is_empty()));
    }

    #[test]
    fn test_remove_field_keeps_foreign_values() {
        let (persistence, deals) = store();
        persistence
            .write(
                Namespace::DealValues,
                "d1",
                br#"{"vendor": "v1", "meta": {"nested": true}}"#,
            )
            .unwrap();
        persistence.write(Namespace::DealValues, "d2", b"not json").unwrap();
        deals.set_value("d3", "stage", Value::text("won"));

        let purge = deals.remove_field("vendor");
        assert_eq!(purge, FieldPurge { updated: 1, skipped: 1 });

        let raw = persistence.read(Namespace::DealValues, "d1").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(json.get("vendor").is_none());
        assert_eq!(json["meta"]["nested"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_in_memory_sources_are_ordered() {
        let mut maps = HashMap::new();
        maps.insert("b".to_string(), ValueMap::new());
        maps.insert("a".to_string(), ValueMap::new());
        let ids: Vec<_> = maps.deal_value_maps().into_iter().map(|m| m.deal_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
