//! Entry store for reference and catalog entries.

use super::types::{CatalogEntry, EntryPatch, ReferenceEntry, StoredEntry};
use crate::error::Error;
use crate::storage::{generate_id, record, Persistence};
use crate::value::{Value, ValueMap};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One persisted collection of entries, kept in creation order.
struct EntryTable<T> {
    persistence: Arc<dyn Persistence>,
    entries: HashMap<String, T>,
    order: Vec<String>,
}

impl<T: StoredEntry> EntryTable<T> {
    fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self {
            persistence,
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn load(persistence: Arc<dyn Persistence>) -> Self {
        let mut loaded: Vec<T> = record::load_all(&*persistence, T::NAMESPACE);
        loaded.sort_by_key(|e| e.created_at());

        let mut table = Self::new(persistence);
        for entry in loaded {
            table.order.push(entry.id().to_string());
            table.entries.insert(entry.id().to_string(), entry);
        }
        table
    }

    fn replace_all(&mut self, entries: Vec<T>) {
        for id in self.order.drain(..) {
            record::unpersist(&*self.persistence, T::NAMESPACE, &id);
        }
        self.entries.clear();
        for entry in entries {
            record::persist(&*self.persistence, T::NAMESPACE, entry.id(), &entry);
            if self.entries.insert(entry.id().to_string(), entry.clone()).is_none() {
                self.order.push(entry.id().to_string());
            }
        }
    }

    fn insert(&mut self, mut entry: T) -> Result<String, Error> {
        if entry.id().is_empty() {
            entry.set_id(generate_id());
        }
        if self.entries.contains_key(entry.id()) {
            return Err(Error::DuplicateId(entry.id().to_string()));
        }
        Ok(self.push(entry))
    }

    fn push(&mut self, mut entry: T) -> String {
        let now = Utc::now();
        entry.stamp(now, now);

        let id = entry.id().to_string();
        record::persist(&*self.persistence, T::NAMESPACE, &id, &entry);
        self.order.push(id.clone());
        self.entries.insert(id.clone(), entry);
        id
    }

    fn update(&mut self, id: &str, patch: EntryPatch) -> Result<(), Error> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::not_found(T::KIND, id))?;
        if let Some(display_value) = patch.display_value.clone() {
            entry.set_display_value(display_value);
        }
        patch.merge_into(entry.fields_mut());
        entry.touch(Utc::now());
        record::persist(&*self.persistence, T::NAMESPACE, id, &*entry);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.entries.remove(id)?;
        self.order.retain(|candidate| candidate != id);
        record::unpersist(&*self.persistence, T::NAMESPACE, id);
        Some(removed)
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    fn of_owner<'a>(&'a self, owner_id: &str) -> impl Iterator<Item = &'a T> + 'a {
        let owner_id = owner_id.to_string();
        self.iter().filter(move |e| e.owner_id() == owner_id)
    }

    fn remove_owner(&mut self, owner_id: &str) -> usize {
        let ids: Vec<String> = self.of_owner(owner_id).map(|e| e.id().to_string()).collect();
        for id in &ids {
            self.remove(id);
        }
        ids.len()
    }

    fn has_value(&self, field_id: &str) -> bool {
        self.entries.values().any(|e| !e.value(field_id).is_empty())
    }

    fn count_values(&self, field_id: &str) -> usize {
        self.entries
            .values()
            .filter(|e| !e.value(field_id).is_empty())
            .count()
    }

    fn remove_field(&mut self, field_id: &str) -> usize {
        let now = Utc::now();
        let mut removed = 0;
        for entry in self.entries.values_mut() {
            if entry.fields_mut().remove(field_id).is_some() {
                entry.touch(now);
                record::persist(&*self.persistence, T::NAMESPACE, entry.id(), &*entry);
                removed += 1;
            }
        }
        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Holds reference entries and catalog entries.
///
/// The store is schema-agnostic: it neither validates field maps nor derives
/// display values. Deleting an entry never touches entries that reference it.
pub struct EntryStore {
    references: EntryTable<ReferenceEntry>,
    catalog_entries: EntryTable<CatalogEntry>,
}

impl EntryStore {
    /// Create an empty store.
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self {
            references: EntryTable::new(persistence.clone()),
            catalog_entries: EntryTable::new(persistence),
        }
    }

    /// Load both entry collections from persistence.
    pub fn load(persistence: Arc<dyn Persistence>) -> Self {
        let store = Self {
            references: EntryTable::load(persistence.clone()),
            catalog_entries: EntryTable::load(persistence),
        };
        debug!(
            reference_entries = store.references.len(),
            catalog_entries = store.catalog_entries.len(),
            "loaded entries"
        );
        store
    }

    pub(crate) fn replace_all(&mut self, references: Vec<ReferenceEntry>, catalog_entries: Vec<CatalogEntry>) {
        self.references.replace_all(references);
        self.catalog_entries.replace_all(catalog_entries);
    }

    // ========== Reference entries ==========

    /// Create a reference entry and return its generated id.
    pub fn create_reference_entry(
        &mut self,
        definition_id: &str,
        display_value: impl Into<String>,
        fields: ValueMap,
    ) -> String {
        let entry = ReferenceEntry::new(generate_id(), definition_id, display_value, fields);
        self.references.push(entry)
    }

    /// Insert a fully built reference entry. An empty id is generated.
    pub fn insert_reference_entry(&mut self, entry: ReferenceEntry) -> Result<String, Error> {
        self.references.insert(entry)
    }

    /// Merge a partial update into a reference entry.
    pub fn update_reference_entry(&mut self, id: &str, patch: EntryPatch) -> Result<(), Error> {
        self.references.update(id, patch)
    }

    /// Delete a reference entry, returning it if it existed.
    pub fn delete_reference_entry(&mut self, id: &str) -> Option<ReferenceEntry> {
        self.references.remove(id)
    }

    /// Get a reference entry by id.
    pub fn reference_entry(&self, id: &str) -> Option<&ReferenceEntry> {
        self.references.get(id)
    }

    /// Entries of a reference definition, in creation order.
    pub fn reference_entries<'a>(&'a self, definition_id: &str) -> impl Iterator<Item = &'a ReferenceEntry> + 'a {
        self.references.of_owner(definition_id)
    }

    /// Every reference entry, in creation order.
    pub fn all_reference_entries(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.references.iter()
    }

    /// Delete every entry of a reference definition.
    pub fn delete_reference_entries_of(&mut self, definition_id: &str) -> usize {
        self.references.remove_owner(definition_id)
    }

    // ========== Catalog entries ==========

    /// Create a catalog entry and return its generated id.
    pub fn create_catalog_entry(
        &mut self,
        catalog_id: &str,
        display_value: impl Into<String>,
        fields: ValueMap,
    ) -> String {
        let entry = CatalogEntry::new(generate_id(), catalog_id, display_value, fields);
        self.catalog_entries.push(entry)
    }

    /// Insert a fully built catalog entry. An empty id is generated.
    pub fn insert_catalog_entry(&mut self, entry: CatalogEntry) -> Result<String, Error> {
        self.catalog_entries.insert(entry)
    }

    /// Merge a partial update into a catalog entry.
    pub fn update_catalog_entry(&mut self, id: &str, patch: EntryPatch) -> Result<(), Error> {
        self.catalog_entries.update(id, patch)
    }

    /// Delete a catalog entry, returning it if it existed.
    pub fn delete_catalog_entry(&mut self, id: &str) -> Option<CatalogEntry> {
        self.catalog_entries.remove(id)
    }

    /// Get a catalog entry by id.
    pub fn catalog_entry(&self, id: &str) -> Option<&CatalogEntry> {
        self.catalog_entries.get(id)
    }

    /// Entries of a catalog, in creation order.
    pub fn catalog_entries<'a>(&'a self, catalog_id: &str) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.catalog_entries.of_owner(catalog_id)
    }

    /// Every catalog entry, in creation order.
    pub fn all_catalog_entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.catalog_entries.iter()
    }

    /// Delete every entry of a catalog.
    pub fn delete_catalog_entries_of(&mut self, catalog_id: &str) -> usize {
        self.catalog_entries.remove_owner(catalog_id)
    }

    // ========== Field values ==========

    /// Check if any entry of either kind holds a non-empty value for a field.
    pub fn has_value(&self, field_id: &str) -> bool {
        self.references.has_value(field_id) || self.catalog_entries.has_value(field_id)
    }

    /// Number of entries holding a non-empty value for a field.
    pub fn value_count(&self, field_id: &str) -> usize {
        self.references.count_values(field_id) + self.catalog_entries.count_values(field_id)
    }

    /// Value of a field on a reference entry; null when either is absent.
    pub fn reference_value(&self, entry_id: &str, field_id: &str) -> &Value {
        self.references
            .get(entry_id)
            .map(|e| e.value(field_id))
            .unwrap_or(&Value::Null)
    }

    /// Drop a field from every entry, returning (reference, catalog) counts.
    pub(crate) fn remove_field_values(&mut self, field_id: &str) -> (usize, usize) {
        (
            self.references.remove_field(field_id),
            self.catalog_entries.remove_field(field_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPersistence;

    fn fields(pairs: &[(&str, Value)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_create_get_list() {
        let mut store = EntryStore::new(Arc::new(MemoryPersistence::new()));
        let a = store.create_reference_entry("companies", "Acme", fields(&[("name", "Acme".into())]));
        let b = store.create_reference_entry("companies", "Globex", ValueMap::new());
        store.create_reference_entry("contacts", "Bob", ValueMap::new());

        assert_eq!(store.reference_entry(&a).unwrap().display_value, "Acme");
        let listed: Vec<_> = store.reference_entries("companies").map(|e| e.id.clone()).collect();
        assert_eq!(listed, vec![a, b]);
    }

    #[test]
    fn test_listing_outlives_owner_id() {
        let mut store = EntryStore::new(Arc::new(MemoryPersistence::new()));
        store.create_reference_entry("companies", "Acme", ValueMap::new());
        store.create_catalog_entry("vendors", "Globex", ValueMap::new());

        let (companies, vendors): (Vec<&ReferenceEntry>, Vec<&CatalogEntry>) = {
            let definition_id = String::from("companies");
            let catalog_id = String::from("vendors");
            (
                store.reference_entries(&definition_id).collect(),
                store.catalog_entries(&catalog_id).collect(),
            )
        };
        assert_eq!(companies[0].display_value, "Acme");
        assert_eq!(vendors[0].display_value, "Globex");
    }

    #[test]
    fn test_insert_keeps_explicit_id() {
        let mut store = EntryStore::new(Arc::new(MemoryPersistence::new()));
        let id = store
            .insert_reference_entry(ReferenceEntry::new("c1", "companies", "Acme", ValueMap::new()))
            .unwrap();
        assert_eq!(id, "c1");
        assert!(matches!(
            store.insert_reference_entry(ReferenceEntry::new("c1", "companies", "Dup", ValueMap::new())),
            Err(Error::DuplicateId(_))
        ));
    }

    #[test]
    fn test_update_merges_and_touches() {
        let mut store = EntryStore::new(Arc::new(MemoryPersistence::new()));
        let id = store.create_catalog_entry("vendors", "Acme", fields(&[("city", "Berlin".into())]));
        let before = store.catalog_entry(&id).unwrap().updated_at;

        store
            .update_catalog_entry(&id, EntryPatch::default().display_value("Acme AG").set("vat", "DE1"))
            .unwrap();

        let entry = store.catalog_entry(&id).unwrap();
        assert_eq!(entry.display_value, "Acme AG");
        assert_eq!(entry.fields["city"], Value::text("Berlin"));
        assert_eq!(entry.fields["vat"], Value::text("DE1"));
        assert!(entry.updated_at >= before);

        assert!(matches!(
            store.update_catalog_entry("nope", EntryPatch::default()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_does_not_cascade() {
        let mut store = EntryStore::new(Arc::new(MemoryPersistence::new()));
        let company = store.create_reference_entry("companies", "Acme", ValueMap::new());
        let contact = store.create_reference_entry(
            "contacts",
            "Bob",
            fields(&[("company", Value::text(company.clone()))]),
        );

        assert!(store.delete_reference_entry(&company).is_some());
        assert!(store.delete_reference_entry(&company).is_none());
        assert_eq!(store.reference_value(&contact, "company"), &Value::text(company));
    }

    #[test]
    fn test_value_tracking() {
        let mut store = EntryStore::new(Arc::new(MemoryPersistence::new()));
        store.create_reference_entry("contacts", "A", fields(&[("tags", Value::List(vec![]))]));
        assert!(!store.has_value("tags"));

        store.create_catalog_entry("vendors", "B", fields(&[("tags", Value::text_list(["x"]))]));
        assert!(store.has_value("tags"));
        assert_eq!(store.value_count("tags"), 1);

        assert_eq!(store.remove_field_values("tags"), (1, 1));
        assert!(!store.has_value("tags"));
    }

    #[test]
    fn test_delete_by_owner() {
        let mut store = EntryStore::new(Arc::new(MemoryPersistence::new()));
        store.create_catalog_entry("vendors", "A", ValueMap::new());
        store.create_catalog_entry("vendors", "B", ValueMap::new());
        store.create_catalog_entry("products", "C", ValueMap::new());

        assert_eq!(store.delete_catalog_entries_of("vendors"), 2);
        assert_eq!(store.all_catalog_entries().count(), 1);
    }

    #[test]
    fn test_reload_preserves_order() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut store = EntryStore::new(persistence.clone());
        let first = store.create_reference_entry("companies", "First", ValueMap::new());
        let second = store.create_reference_entry("companies", "Second", ValueMap::new());

        let reloaded = EntryStore::load(persistence);
        let ids: Vec<_> = reloaded.reference_entries("companies").map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first) && ids.contains(&second));
    }

    #[test]
    fn test_persistence_failure_keeps_memory_state() {
        let persistence = Arc::new(MemoryPersistence::new());
        persistence.set_failing(true);
        let mut store = EntryStore::new(persistence.clone());

        let id = store.create_reference_entry("companies", "Acme", ValueMap::new());
        assert!(store.reference_entry(&id).is_some());
        persistence.set_failing(false);
        assert!(persistence.is_empty());
    }
}
