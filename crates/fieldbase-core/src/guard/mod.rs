//! Schema mutation guard.
//!
//! A field is locked while any record holds a non-empty value for it.
//! Structural edits to locked fields are dropped (see [`policy`]); the
//! confirmed catalog-target change purges stale values (see [`cleanup`]).

pub mod cleanup;
pub mod policy;

pub use cleanup::CleanupReport;
pub use policy::{FieldLocks, NoLocks};

use crate::deal::{DealValueSource, DealValues};
use crate::entry::EntryStore;
use crate::schema::{FieldDefinition, SchemaStore};

/// Answers lock questions against the entry store and, optionally, a
/// snapshot of the deal value maps.
pub struct MutationGuard<'a> {
    entries: &'a EntryStore,
    deal_maps: Vec<DealValues>,
}

impl<'a> MutationGuard<'a> {
    /// Guard over entries only.
    pub fn new(entries: &'a EntryStore) -> Self {
        Self {
            entries,
            deal_maps: Vec::new(),
        }
    }

    /// Also consider deal value maps, read once now.
    pub fn with_deal_values(mut self, source: &dyn DealValueSource) -> Self {
        self.deal_maps = source.deal_value_maps();
        self
    }

    /// Check if any entry or deal holds a non-empty value for the field.
    pub fn is_locked(&self, field_id: &str) -> bool {
        self.entries.has_value(field_id) || self.deal_maps.iter().any(|m| holds(m, field_id))
    }

    /// Number of records (entries and deals) holding a non-empty value.
    pub fn value_count(&self, field_id: &str) -> usize {
        self.entries.value_count(field_id)
            + self.deal_maps.iter().filter(|m| holds(m, field_id)).count()
    }

    /// Check if a definition or any of its sub-fields is locked.
    pub fn definition_locked(&self, definition: &FieldDefinition) -> bool {
        self.is_locked(&definition.id) || definition.sub_fields().iter().any(|s| self.is_locked(&s.id))
    }

    /// Check if a definition is used anywhere: locked, or targeted or sourced
    /// by another part of the schema.
    pub fn definition_in_use(&self, schemas: &SchemaStore, definition: &FieldDefinition) -> bool {
        self.definition_locked(definition) || !schemas.dependents_of(&definition.id).is_empty()
    }
}

fn holds(map: &DealValues, field_id: &str) -> bool {
    map.values.get(field_id).is_some_and(|v| !v.is_empty())
}

impl FieldLocks for MutationGuard<'_> {
    fn is_locked(&self, field_id: &str) -> bool {
        MutationGuard::is_locked(self, field_id)
    }
}
