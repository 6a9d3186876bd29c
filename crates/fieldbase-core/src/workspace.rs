//! Session-scoped facade over the schema, entry and deal stores.
//!
//! A [`Workspace`] owns every store and exposes the operations that need more
//! than one of them: guarded schema edits, validated entry writes, cascading
//! deletes and composite deal queries.

use crate::deal::{DealLinkageScanner, DealRecord, DealValueStore, PersistedDeals};
use crate::entry::{
    validate_catalog_fields, validate_reference_fields, CatalogEntry, EntryPatch, EntryStore,
    ReferenceEntry,
};
use crate::error::Error;
use crate::guard::{cleanup, CleanupReport, MutationGuard};
use crate::relation::{CascadeFilter, RelationshipResolver};
use crate::schema::{
    CatalogFieldDef, CatalogFieldPatch, CatalogPatch, CatalogSchema, FieldDefinition,
    FieldDefinitionPatch, FieldUpdateReport, SchemaStore, SubFieldDefinition, SubFieldPatch,
};
use crate::storage::{MemoryPersistence, Namespace, Persistence, SledPersistence, StoreConfig};
use crate::value::ValueMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything needed to seed a workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialState {
    /// Field definitions.
    pub field_definitions: Vec<FieldDefinition>,
    /// Catalog schemas.
    pub catalogs: Vec<CatalogSchema>,
    /// Reference entries.
    pub reference_entries: Vec<ReferenceEntry>,
    /// Catalog entries.
    pub catalog_entries: Vec<CatalogEntry>,
    /// Deal value maps keyed by deal id.
    pub deal_values: BTreeMap<String, ValueMap>,
    /// Deal records.
    pub deals: Vec<DealRecord>,
}

/// Result of deleting a field definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The definition was unused and is gone, with its entries.
    Deleted {
        /// Entries deleted along with it.
        entries_removed: usize,
    },
    /// The definition is in use and was deactivated instead.
    Deactivated,
}

/// Result of a catalog-link target change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetChange {
    /// The new target is in place. `cleanup` is set when stale values were purged.
    Applied {
        /// What the cleanup pass removed.
        cleanup: Option<CleanupReport>,
    },
    /// The field already points at that catalog.
    Unchanged,
    /// The field is in use; nothing changed. Repeat with confirmation to
    /// switch the target and purge its values.
    ConfirmationRequired {
        /// The field.
        field_id: String,
        /// Records holding a value for it.
        value_count: usize,
    },
}

/// A schema and entry session over one persistence backend.
pub struct Workspace {
    persistence: Arc<dyn Persistence>,
    schemas: SchemaStore,
    entries: EntryStore,
    deal_values: DealValueStore,
    deals: PersistedDeals,
}

impl Workspace {
    /// Open a sled-backed workspace, loading whatever it already holds.
    pub fn open(config: &StoreConfig) -> Result<Self, Error> {
        let sled = SledPersistence::open(config)?;
        if sled.was_recovered() {
            debug!(path = %config.path.display(), "reopened existing database");
        }
        Ok(Self::with_persistence(Arc::new(sled)))
    }

    /// A workspace that persists nothing beyond the process.
    pub fn in_memory() -> Self {
        Self::with_persistence(Arc::new(MemoryPersistence::new()))
    }

    /// Load a workspace from any backend.
    pub fn with_persistence(persistence: Arc<dyn Persistence>) -> Self {
        let schemas = SchemaStore::load(persistence.clone());
        let entries = EntryStore::load(persistence.clone());
        info!(
            field_definitions = schemas.field_definitions().count(),
            catalogs = schemas.catalogs().count(),
            "workspace loaded"
        );
        Self {
            schemas,
            entries,
            deal_values: DealValueStore::new(persistence.clone()),
            deals: PersistedDeals::new(persistence.clone()),
            persistence,
        }
    }

    /// Replace the whole state, persisting it.
    pub fn init(&mut self, state: InitialState) {
        self.schemas.replace_all(state.field_definitions, state.catalogs);
        self.entries
            .replace_all(state.reference_entries, state.catalog_entries);

        for namespace in [Namespace::DealValues, Namespace::Deals] {
            let existing = match self.persistence.scan(namespace) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(namespace = %namespace, error = %e, "failed to scan records to replace");
                    Vec::new()
                }
            };
            for (id, _) in existing {
                crate::storage::record::unpersist(&*self.persistence, namespace, &id);
            }
        }
        for (deal_id, values) in &state.deal_values {
            self.deal_values.set_values(deal_id, values);
        }
        for deal in &state.deals {
            self.deals.put(deal);
        }
        info!(
            deal_values = state.deal_values.len(),
            deals = state.deals.len(),
            "workspace initialized"
        );
    }

    // ========== Components ==========

    /// The schema store.
    pub fn schemas(&self) -> &SchemaStore {
        &self.schemas
    }

    /// The entry store.
    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    /// Deal value maps.
    pub fn deal_values(&self) -> &DealValueStore {
        &self.deal_values
    }

    /// Deal records.
    pub fn deals(&self) -> &PersistedDeals {
        &self.deals
    }

    /// A guard over entries and the current deal value maps.
    pub fn guard(&self) -> MutationGuard<'_> {
        MutationGuard::new(&self.entries).with_deal_values(&self.deal_values)
    }

    /// A relationship resolver over the current state.
    pub fn resolver(&self) -> RelationshipResolver<'_> {
        RelationshipResolver::new(&self.schemas, &self.entries)
    }

    /// A cascade filter over the current entries.
    pub fn cascade(&self) -> CascadeFilter<'_> {
        CascadeFilter::new(&self.entries)
    }

    /// A deal linkage scanner over persisted deals.
    pub fn scanner(&self) -> DealLinkageScanner<'_, DealValueStore, PersistedDeals> {
        DealLinkageScanner::new(&self.deal_values, &self.deals)
    }

    /// Check if live data depends on a field.
    pub fn is_locked(&self, field_id: &str) -> bool {
        self.guard().is_locked(field_id)
    }

    // ========== Field definitions ==========

    /// Create a field definition.
    pub fn create_field_definition(&mut self, definition: FieldDefinition) -> Result<String, Error> {
        self.schemas.create_field_definition(definition)
    }

    /// Update a field definition; structural changes to locked fields are dropped.
    pub fn update_field_definition(
        &mut self,
        id: &str,
        patch: FieldDefinitionPatch,
    ) -> Result<FieldUpdateReport, Error> {
        let guard = MutationGuard::new(&self.entries).with_deal_values(&self.deal_values);
        self.schemas.update_field_definition(id, patch, &guard)
    }

    /// Add a sub-field to a reference definition.
    pub fn add_sub_field(&mut self, definition_id: &str, sub_field: SubFieldDefinition) -> Result<String, Error> {
        self.schemas.add_sub_field(definition_id, sub_field)
    }

    /// Update a sub-field; structural changes to locked sub-fields are dropped.
    pub fn update_sub_field(
        &mut self,
        definition_id: &str,
        sub_field_id: &str,
        patch: SubFieldPatch,
    ) -> Result<FieldUpdateReport, Error> {
        let guard = MutationGuard::new(&self.entries).with_deal_values(&self.deal_values);
        self.schemas
            .update_sub_field(definition_id, sub_field_id, patch, &guard)
    }

    /// Remove a sub-field unless it is locked.
    pub fn remove_sub_field(&mut self, definition_id: &str, sub_field_id: &str) -> Result<FieldUpdateReport, Error> {
        let guard = MutationGuard::new(&self.entries).with_deal_values(&self.deal_values);
        self.schemas.remove_sub_field(definition_id, sub_field_id, &guard)
    }

    /// Hide a field definition.
    pub fn deactivate_field_definition(&mut self, id: &str) -> Result<(), Error> {
        self.schemas.deactivate_field_definition(id)
    }

    /// Show a field definition again.
    pub fn reactivate_field_definition(&mut self, id: &str) -> Result<(), Error> {
        self.schemas.reactivate_field_definition(id)
    }

    /// Delete a field definition.
    ///
    /// An unused definition is removed with its entries. One that holds data
    /// or that other schema points at is deactivated instead.
    pub fn delete_field_definition(&mut self, id: &str) -> Result<DeleteOutcome, Error> {
        let definition = self
            .schemas
            .field_definition(id)
            .ok_or_else(|| Error::not_found("field definition", id))?;

        if self.guard().definition_in_use(&self.schemas, definition) {
            self.schemas.deactivate_field_definition(id)?;
            info!(definition_id = id, "field definition in use, deactivated instead of deleted");
            return Ok(DeleteOutcome::Deactivated);
        }

        self.schemas.remove_field_definition(id)?;
        let entries_removed = self.entries.delete_reference_entries_of(id);
        info!(definition_id = id, entries_removed, "deleted field definition");
        Ok(DeleteOutcome::Deleted { entries_removed })
    }

    // ========== Catalogs ==========

    /// Create a catalog schema.
    pub fn create_catalog(&mut self, catalog: CatalogSchema) -> Result<String, Error> {
        self.schemas.create_catalog(catalog)
    }

    /// Update catalog-level attributes.
    pub fn update_catalog(&mut self, id: &str, patch: CatalogPatch) -> Result<(), Error> {
        self.schemas.update_catalog(id, patch)
    }

    /// Add a column to a catalog.
    pub fn add_catalog_field(&mut self, catalog_id: &str, field: CatalogFieldDef) -> Result<String, Error> {
        self.schemas.add_catalog_field(catalog_id, field)
    }

    /// Update a catalog column; structural changes to locked columns are dropped.
    pub fn update_catalog_field(
        &mut self,
        catalog_id: &str,
        field_id: &str,
        patch: CatalogFieldPatch,
    ) -> Result<FieldUpdateReport, Error> {
        let guard = MutationGuard::new(&self.entries).with_deal_values(&self.deal_values);
        self.schemas
            .update_catalog_field(catalog_id, field_id, patch, &guard)
    }

    /// Remove a catalog column unless it is locked.
    pub fn remove_catalog_field(&mut self, catalog_id: &str, field_id: &str) -> Result<FieldUpdateReport, Error> {
        let guard = MutationGuard::new(&self.entries).with_deal_values(&self.deal_values);
        self.schemas.remove_catalog_field(catalog_id, field_id, &guard)
    }

    /// Hide a catalog.
    pub fn deactivate_catalog(&mut self, id: &str) -> Result<(), Error> {
        self.schemas.deactivate_catalog(id)
    }

    /// Show a catalog again.
    pub fn reactivate_catalog(&mut self, id: &str) -> Result<(), Error> {
        self.schemas.reactivate_catalog(id)
    }

    /// Delete a catalog and every entry in it. Returns the number of entries removed.
    ///
    /// Ids of the removed entries stored elsewhere are left alone and resolve
    /// as missing.
    pub fn delete_catalog(&mut self, id: &str) -> Result<usize, Error> {
        self.schemas.remove_catalog(id)?;
        let removed = self.entries.delete_catalog_entries_of(id);
        info!(catalog_id = id, entries_removed = removed, "deleted catalog");
        Ok(removed)
    }

    /// Point a catalog-link field (definition or catalog column) at another catalog.
    ///
    /// An unused field is switched directly. A used field is left alone
    /// unless `confirmed`; with confirmation the target is switched and every
    /// value of the field is removed from entries and deal value maps.
    /// Catalog columns sourced from a definition follow its target, so their
    /// values are counted and removed with the definition's.
    pub fn change_catalog_target(
        &mut self,
        field_id: &str,
        catalog_id: &str,
        confirmed: bool,
    ) -> Result<TargetChange, Error> {
        let current = self
            .schemas
            .field_definition(field_id)
            .and_then(|d| d.kind.catalog_target())
            .or_else(|| {
                self.schemas
                    .find_catalog_field(field_id)
                    .and_then(|(_, f)| f.field_type.catalog_target())
            })
            .map(|(target, _)| target.to_string())
            .ok_or_else(|| Error::not_found("catalog link field", field_id))?;

        if self.schemas.catalog(catalog_id).is_none() {
            return Err(Error::InvalidSchema(format!("unknown catalog '{}'", catalog_id)));
        }
        if current == catalog_id {
            return Ok(TargetChange::Unchanged);
        }

        let mut affected = vec![field_id.to_string()];
        if self.schemas.field_definition(field_id).is_some() {
            affected.extend(self.schemas.sourced_column_ids(field_id));
        }
        let value_count = {
            let guard = self.guard();
            affected.iter().map(|id| guard.value_count(id)).sum::<usize>()
        };
        if value_count == 0 {
            self.schemas.set_catalog_target(field_id, catalog_id)?;
            return Ok(TargetChange::Applied { cleanup: None });
        }
        if !confirmed {
            debug!(field_id, value_count, "catalog target change needs confirmation");
            return Ok(TargetChange::ConfirmationRequired {
                field_id: field_id.to_string(),
                value_count,
            });
        }

        self.schemas.set_catalog_target(field_id, catalog_id)?;
        let mut report = CleanupReport {
            field_id: field_id.to_string(),
            ..CleanupReport::default()
        };
        for id in &affected {
            report.absorb(cleanup::purge_field_values(id, &mut self.entries, &self.deal_values));
        }
        Ok(TargetChange::Applied {
            cleanup: Some(report),
        })
    }

    // ========== Reference entries ==========

    /// Create a reference entry after checking required sub-fields.
    pub fn create_reference_entry(
        &mut self,
        definition_id: &str,
        display_value: impl Into<String>,
        fields: ValueMap,
    ) -> Result<String, Error> {
        let definition = self.reference_definition(definition_id)?;
        validate_reference_fields(definition, &fields)?;
        Ok(self
            .entries
            .create_reference_entry(definition_id, display_value, fields))
    }

    /// Insert a fully built reference entry (keeping its id) after the same
    /// checks as [`Workspace::create_reference_entry`].
    pub fn insert_reference_entry(&mut self, entry: ReferenceEntry) -> Result<String, Error> {
        let definition = self.reference_definition(&entry.definition_id)?;
        validate_reference_fields(definition, &entry.fields)?;
        self.entries.insert_reference_entry(entry)
    }

    /// Merge a partial update into a reference entry, re-checking required
    /// sub-fields against the merged map.
    pub fn update_reference_entry(&mut self, id: &str, patch: EntryPatch) -> Result<(), Error> {
        let entry = self
            .entries
            .reference_entry(id)
            .ok_or_else(|| Error::not_found("reference entry", id))?;
        if let Some(definition) = self.schemas.field_definition(&entry.definition_id) {
            let mut merged = entry.fields.clone();
            patch.merge_into(&mut merged);
            validate_reference_fields(definition, &merged)?;
        }
        self.entries.update_reference_entry(id, patch)
    }

    /// Delete a reference entry. Returns whether it existed.
    pub fn delete_reference_entry(&mut self, id: &str) -> bool {
        self.entries.delete_reference_entry(id).is_some()
    }

    /// Get a reference entry.
    pub fn reference_entry(&self, id: &str) -> Option<&ReferenceEntry> {
        self.entries.reference_entry(id)
    }

    /// Entries of a reference definition.
    pub fn reference_entries(&self, definition_id: &str) -> Vec<&ReferenceEntry> {
        self.entries.reference_entries(definition_id).collect()
    }

    // ========== Catalog entries ==========

    /// Create a catalog entry after checking required columns.
    pub fn create_catalog_entry(
        &mut self,
        catalog_id: &str,
        display_value: impl Into<String>,
        fields: ValueMap,
    ) -> Result<String, Error> {
        let catalog = self
            .schemas
            .catalog(catalog_id)
            .ok_or_else(|| Error::not_found("catalog", catalog_id))?;
        validate_catalog_fields(catalog, &fields)?;
        Ok(self
            .entries
            .create_catalog_entry(catalog_id, display_value, fields))
    }

    /// Insert a fully built catalog entry (keeping its id) after checking
    /// required columns.
    pub fn insert_catalog_entry(&mut self, entry: CatalogEntry) -> Result<String, Error> {
        let catalog = self
            .schemas
            .catalog(&entry.catalog_id)
            .ok_or_else(|| Error::not_found("catalog", &entry.catalog_id))?;
        validate_catalog_fields(catalog, &entry.fields)?;
        self.entries.insert_catalog_entry(entry)
    }

    /// Merge a partial update into a catalog entry, re-checking required columns.
    pub fn update_catalog_entry(&mut self, id: &str, patch: EntryPatch) -> Result<(), Error> {
        let entry = self
            .entries
            .catalog_entry(id)
            .ok_or_else(|| Error::not_found("catalog entry", id))?;
        if let Some(catalog) = self.schemas.catalog(&entry.catalog_id) {
            let mut merged = entry.fields.clone();
            patch.merge_into(&mut merged);
            validate_catalog_fields(catalog, &merged)?;
        }
        self.entries.update_catalog_entry(id, patch)
    }

    /// Delete a catalog entry. Returns whether it existed.
    pub fn delete_catalog_entry(&mut self, id: &str) -> bool {
        self.entries.delete_catalog_entry(id).is_some()
    }

    /// Get a catalog entry.
    pub fn catalog_entry(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.catalog_entry(id)
    }

    /// Entries of a catalog.
    pub fn catalog_entries(&self, catalog_id: &str) -> Vec<&CatalogEntry> {
        self.entries.catalog_entries(catalog_id).collect()
    }

    // ========== Deals ==========

    /// Replace a deal's value map.
    pub fn set_deal_values(&self, deal_id: &str, values: &ValueMap) {
        self.deal_values.set_values(deal_id, values);
    }

    /// Store a deal record.
    pub fn put_deal(&self, deal: &DealRecord) {
        self.deals.put(deal);
    }

    /// Deals whose value maps reference any of `entry_ids`.
    pub fn deals_referencing(&self, entry_ids: &HashSet<String>) -> Vec<DealRecord> {
        self.scanner().deals_referencing(entry_ids)
    }

    /// Deals referencing a reference entry or anything linked to it, in one scan.
    pub fn deals_for_entry(&self, entry_id: &str) -> Result<Vec<DealRecord>, Error> {
        let mut ids = self.resolver().resolve(entry_id)?.linked_ids();
        ids.insert(entry_id.to_string());
        Ok(self.deals_referencing(&ids))
    }

    /// Deals referencing a catalog entry or anything linked to it, in one scan.
    pub fn deals_for_catalog_entry(&self, entry_id: &str) -> Result<Vec<DealRecord>, Error> {
        let mut ids = self.resolver().resolve_catalog_entry(entry_id)?.linked_ids();
        ids.insert(entry_id.to_string());
        Ok(self.deals_referencing(&ids))
    }

    /// Flush pending writes to the backend.
    pub fn flush(&self) -> Result<(), Error> {
        self.persistence.flush()
    }

    fn reference_definition(&self, definition_id: &str) -> Result<&FieldDefinition, Error> {
        let definition = self
            .schemas
            .field_definition(definition_id)
            .ok_or_else(|| Error::not_found("field definition", definition_id))?;
        if !definition.kind.is_reference() {
            return Err(Error::InvalidSchema(format!(
                "'{}' is not a reference definition",
                definition_id
            )));
        }
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, LockedAttribute, ReferenceTarget, ScalarKind};
    use crate::value::Value;

    fn map(pairs: &[(&str, Value)]) -> ValueMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn workspace() -> Workspace {
        let mut ws = Workspace::in_memory();
        ws.create_field_definition(
            FieldDefinition::reference("companies", "Companies")
                .with_sub_field(SubFieldDefinition::scalar("company_name", "Name", ScalarKind::Text).required()),
        )
        .unwrap();
        ws.create_field_definition(
            FieldDefinition::reference("contacts", "Contacts")
                .with_sub_field(SubFieldDefinition::scalar("contact_name", "Name", ScalarKind::Text).required())
                .with_sub_field(SubFieldDefinition::reference(
                    "contact_company",
                    "Company",
                    ReferenceTarget::new("companies"),
                )),
        )
        .unwrap();
        ws
    }

    #[test]
    fn test_required_fields_block_write() {
        let mut ws = workspace();
        let err = ws
            .create_reference_entry("companies", "", ValueMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::Validation { missing } if missing == vec!["company_name"]));
        assert!(ws.reference_entries("companies").is_empty());

        let id = ws
            .create_reference_entry("companies", "Acme", map(&[("company_name", "Acme".into())]))
            .unwrap();
        assert!(ws
            .update_reference_entry(&id, EntryPatch::default().set("company_name", ""))
            .is_err());
        assert_eq!(
            ws.reference_entry(&id).unwrap().fields["company_name"],
            Value::text("Acme")
        );
    }

    #[test]
    fn test_entries_need_reference_definition() {
        let mut ws = workspace();
        ws.create_field_definition(FieldDefinition::new("plain", "Plain", FieldKind::Scalar(ScalarKind::Text)))
            .unwrap();
        assert!(matches!(
            ws.create_reference_entry("plain", "x", ValueMap::new()),
            Err(Error::InvalidSchema(_))
        ));
        assert!(matches!(
            ws.create_reference_entry("nope", "x", ValueMap::new()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_unused_definition() {
        let mut ws = workspace();
        ws.create_field_definition(
            FieldDefinition::reference("tags", "Tags")
                .with_sub_field(SubFieldDefinition::scalar("tag_label", "Label", ScalarKind::Text)),
        )
        .unwrap();
        ws.create_reference_entry("tags", "", ValueMap::new()).unwrap();

        assert_eq!(
            ws.delete_field_definition("tags").unwrap(),
            DeleteOutcome::Deleted { entries_removed: 1 }
        );
        assert!(ws.schemas().field_definition("tags").is_none());
    }

    #[test]
    fn test_delete_used_definition_deactivates() {
        let mut ws = workspace();
        ws.create_reference_entry("companies", "Acme", map(&[("company_name", "Acme".into())]))
            .unwrap();

        assert_eq!(ws.delete_field_definition("companies").unwrap(), DeleteOutcome::Deactivated);
        let definition = ws.schemas().field_definition("companies").unwrap();
        assert!(!definition.active);
        assert_eq!(ws.reference_entries("companies").len(), 1);
    }

    #[test]
    fn test_targeted_definition_is_in_use() {
        let mut ws = workspace();
        assert_eq!(ws.delete_field_definition("companies").unwrap(), DeleteOutcome::Deactivated);
    }

    #[test]
    fn test_locked_update_through_workspace() {
        let mut ws = workspace();
        ws.create_reference_entry(
            "contacts",
            "Bob",
            map(&[("contact_name", "Bob".into()), ("contact_company", "c1".into())]),
        )
        .unwrap();

        let report = ws
            .update_sub_field(
                "contacts",
                "contact_company",
                SubFieldPatch::default()
                    .name("Employer")
                    .field_type(crate::schema::SubFieldType::Scalar(ScalarKind::Text)),
            )
            .unwrap();
        assert_eq!(report.ignored_for("contact_company"), vec![LockedAttribute::Type]);
        let (_, sub) = ws.schemas().find_sub_field("contact_company").unwrap();
        assert_eq!(sub.name, "Employer");
        assert!(sub.field_type.reference_target().is_some());
    }

    #[test]
    fn test_deal_values_lock_catalog_link_definition() {
        let mut ws = workspace();
        ws.create_catalog(CatalogSchema::new("vendors", "Vendors")).unwrap();
        ws.create_catalog(CatalogSchema::new("suppliers", "Suppliers")).unwrap();
        ws.create_field_definition(FieldDefinition::catalog_link("deal_vendor", "Vendor", "vendors", false))
            .unwrap();
        ws.set_deal_values("d1", &map(&[("deal_vendor", "v1".into())]));

        let report = ws
            .update_field_definition(
                "deal_vendor",
                FieldDefinitionPatch::default().kind(FieldKind::CatalogLink {
                    catalog_id: "suppliers".into(),
                    multiple: false,
                }),
            )
            .unwrap();
        assert_eq!(report.ignored_for("deal_vendor"), vec![LockedAttribute::Target]);
        assert!(ws.is_locked("deal_vendor"));
    }

    #[test]
    fn test_target_change_flow() {
        let mut ws = workspace();
        ws.create_catalog(CatalogSchema::new("vendors", "Vendors")).unwrap();
        ws.create_catalog(CatalogSchema::new("suppliers", "Suppliers")).unwrap();
        ws.create_field_definition(FieldDefinition::catalog_link("deal_vendor", "Vendor", "vendors", false))
            .unwrap();

        assert_eq!(
            ws.change_catalog_target("deal_vendor", "vendors", false).unwrap(),
            TargetChange::Unchanged
        );
        assert_eq!(
            ws.change_catalog_target("deal_vendor", "suppliers", false).unwrap(),
            TargetChange::Applied { cleanup: None }
        );

        ws.set_deal_values("d1", &map(&[("deal_vendor", "s1".into()), ("stage", "won".into())]));
        assert_eq!(
            ws.change_catalog_target("deal_vendor", "vendors", false).unwrap(),
            TargetChange::ConfirmationRequired {
                field_id: "deal_vendor".into(),
                value_count: 1
            }
        );
        assert_eq!(
            ws.schemas().field_definition("deal_vendor").unwrap().kind.catalog_target(),
            Some(("suppliers", false))
        );

        let TargetChange::Applied { cleanup: Some(report) } =
            ws.change_catalog_target("deal_vendor", "vendors", true).unwrap()
        else {
            panic!("expected a cleanup pass");
        };
        assert_eq!(report.deals, 1);
        assert!(!ws.deal_values().values("d1").contains_key("deal_vendor"));
        assert!(ws.deal_values().values("d1").contains_key("stage"));
        assert!(!ws.is_locked("deal_vendor"));

        assert!(matches!(
            ws.change_catalog_target("deal_vendor", "nowhere", true),
            Err(Error::InvalidSchema(_))
        ));
        assert!(matches!(
            ws.change_catalog_target("contacts", "vendors", true),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_target_change_covers_sourced_columns() {
        let mut ws = workspace();
        ws.create_catalog(CatalogSchema::new("vendors", "Vendors")).unwrap();
        ws.create_catalog(CatalogSchema::new("suppliers", "Suppliers")).unwrap();
        ws.create_field_definition(FieldDefinition::catalog_link("deal_vendor", "Vendor", "vendors", false))
            .unwrap();
        ws.create_catalog(
            CatalogSchema::new("projects", "Projects")
                .with_field(CatalogFieldDef::sourced("p_vendor", "Vendor", "deal_vendor")),
        )
        .unwrap();
        let project = ws
            .create_catalog_entry("projects", "Apollo", map(&[("p_vendor", "V1".into())]))
            .unwrap();

        assert_eq!(
            ws.change_catalog_target("deal_vendor", "suppliers", false).unwrap(),
            TargetChange::ConfirmationRequired {
                field_id: "deal_vendor".into(),
                value_count: 1
            }
        );
        let column = |ws: &Workspace| {
            ws.schemas()
                .find_catalog_field("p_vendor")
                .and_then(|(_, f)| f.field_type.catalog_target().map(|(c, _)| c.to_string()))
        };
        assert_eq!(column(&ws).as_deref(), Some("vendors"));
        assert!(ws.catalog_entry(&project).unwrap().fields.contains_key("p_vendor"));

        let TargetChange::Applied { cleanup: Some(report) } =
            ws.change_catalog_target("deal_vendor", "suppliers", true).unwrap()
        else {
            panic!("expected a cleanup pass");
        };
        assert_eq!(report.field_id, "deal_vendor");
        assert_eq!(report.catalog_entries, 1);
        assert_eq!(report.deals, 0);
        assert_eq!(column(&ws).as_deref(), Some("suppliers"));
        assert!(!ws.catalog_entry(&project).unwrap().fields.contains_key("p_vendor"));
        assert!(!ws.is_locked("p_vendor"));
    }

    #[test]
    fn test_init_with_unavailable_storage() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut ws = Workspace::with_persistence(persistence.clone());
        persistence.set_failing(true);
        ws.init(InitialState {
            catalogs: vec![CatalogSchema::new("vendors", "Vendors")],
            deal_values: BTreeMap::from([("d1".to_string(), map(&[("contact", "p1".into())]))]),
            ..InitialState::default()
        });
        assert!(ws.schemas().catalog("vendors").is_some());
        assert_eq!(ws.schemas().field_definitions().count(), 0);

        persistence.set_failing(false);
        ws.set_deal_values("d2", &map(&[("contact", "p2".into())]));
        assert_eq!(ws.deal_values().values("d2")["contact"], Value::text("p2"));
    }

    #[test]
    fn test_delete_catalog_cascades_entries() {
        let mut ws = workspace();
        ws.create_catalog(CatalogSchema::new("vendors", "Vendors")).unwrap();
        ws.create_catalog_entry("vendors", "Acme", ValueMap::new()).unwrap();
        ws.create_catalog_entry("vendors", "Globex", ValueMap::new()).unwrap();

        assert_eq!(ws.delete_catalog("vendors").unwrap(), 2);
        assert!(ws.catalog_entries("vendors").is_empty());
        assert!(ws.schemas().catalog("vendors").is_none());
    }

    #[test]
    fn test_init_replaces_state() {
        let mut ws = workspace();
        let state: InitialState = serde_json::from_value(serde_json::json!({
            "deal_values": {"d1": {"contact": "p1"}},
            "deals": [{"id": "d1", "body": {"title": "Deal"}}]
        }))
        .unwrap();
        ws.init(state);

        assert_eq!(ws.schemas().field_definitions().count(), 0);
        assert_eq!(ws.deals().all().len(), 1);
        assert_eq!(ws.deal_values().values("d1")["contact"], Value::text("p1"));
    }
}
