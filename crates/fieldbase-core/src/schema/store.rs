//! Schema store for field definitions and catalog schemas.

use super::{
    CatalogFieldDef, CatalogFieldPatch, CatalogFieldType, CatalogPatch, CatalogSchema,
    FieldDefinition, FieldDefinitionPatch, FieldKind, FieldUpdateReport, LockedAttribute,
    SubFieldDefinition, SubFieldPatch,
};
use crate::error::Error;
use crate::guard::policy::{self, FieldLocks};
use crate::storage::{generate_id, record, Namespace, Persistence};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

/// Holds the mutable schema: field definitions and catalog schemas.
///
/// Collections are kept in creation order. Every mutation writes through to
/// persistence; write failures are logged and do not affect the in-memory
/// state.
pub struct SchemaStore {
    persistence: Arc<dyn Persistence>,
    definitions: Vec<FieldDefinition>,
    catalogs: Vec<CatalogSchema>,
}

impl SchemaStore {
    /// Create an empty store.
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self {
            persistence,
            definitions: Vec::new(),
            catalogs: Vec::new(),
        }
    }

    /// Load definitions and catalogs from persistence.
    pub fn load(persistence: Arc<dyn Persistence>) -> Self {
        let mut definitions: Vec<FieldDefinition> =
            record::load_all(&*persistence, Namespace::FieldDefinitions);
        let mut catalogs: Vec<CatalogSchema> = record::load_all(&*persistence, Namespace::Catalogs);
        definitions.sort_by_key(|d| d.created_at);
        catalogs.sort_by_key(|c| c.created_at);

        Self {
            persistence,
            definitions,
            catalogs,
        }
    }

    /// Replace every definition and catalog, persisting the new set.
    pub(crate) fn replace_all(
        &mut self,
        definitions: Vec<FieldDefinition>,
        catalogs: Vec<CatalogSchema>,
    ) {
        for old in self.definitions.drain(..) {
            record::unpersist(&*self.persistence, Namespace::FieldDefinitions, &old.id);
        }
        for old in self.catalogs.drain(..) {
            record::unpersist(&*self.persistence, Namespace::Catalogs, &old.id);
        }
        for definition in &definitions {
            record::persist(&*self.persistence, Namespace::FieldDefinitions, &definition.id, definition);
        }
        for catalog in &catalogs {
            record::persist(&*self.persistence, Namespace::Catalogs, &catalog.id, catalog);
        }
        self.definitions = definitions;
        self.catalogs = catalogs;
    }

    // ========== Lookups ==========

    /// Get a field definition by id (active or not).
    pub fn field_definition(&self, id: &str) -> Option<&FieldDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// All field definitions, in creation order.
    pub fn field_definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definitions.iter()
    }

    /// Active field definitions, in creation order.
    pub fn active_field_definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definitions.iter().filter(|d| d.active)
    }

    /// Find the reference definition owning a sub-field.
    pub fn find_sub_field(&self, sub_field_id: &str) -> Option<(&FieldDefinition, &SubFieldDefinition)> {
        self.definitions
            .iter()
            .find_map(|d| d.sub_field(sub_field_id).map(|s| (d, s)))
    }

    /// Get a catalog by id (active or not).
    pub fn catalog(&self, id: &str) -> Option<&CatalogSchema> {
        self.catalogs.iter().find(|c| c.id == id)
    }

    /// All catalogs, in creation order.
    pub fn catalogs(&self) -> impl Iterator<Item = &CatalogSchema> {
        self.catalogs.iter()
    }

    /// Active catalogs, in creation order.
    pub fn active_catalogs(&self) -> impl Iterator<Item = &CatalogSchema> {
        self.catalogs.iter().filter(|c| c.active)
    }

    /// Find the catalog owning a column.
    pub fn find_catalog_field(&self, field_id: &str) -> Option<(&CatalogSchema, &CatalogFieldDef)> {
        self.catalogs
            .iter()
            .find_map(|c| c.field(field_id).map(|f| (c, f)))
    }

    /// Check if an id is taken by any definition, sub-field, catalog, or column.
    pub fn id_in_use(&self, id: &str) -> bool {
        self.definitions
            .iter()
            .any(|d| d.id == id || d.sub_fields().iter().any(|s| s.id == id))
            || self
                .catalogs
                .iter()
                .any(|c| c.id == id || c.fields.iter().any(|f| f.id == id))
    }

    /// Ids of schema elements elsewhere that point at a field definition:
    /// sub-fields targeting it and catalog columns sourced from it.
    pub fn dependents_of(&self, definition_id: &str) -> Vec<String> {
        let mut dependents = Vec::new();
        for definition in &self.definitions {
            if definition.id == definition_id {
                continue;
            }
            for (sub_field, target) in definition.link_sub_fields() {
                if target.definition_id == definition_id {
                    dependents.push(sub_field.id.clone());
                }
            }
        }
        dependents.extend(self.sourced_column_ids(definition_id));
        dependents
    }

    /// Ids of catalog columns whose type is derived from a field definition.
    pub fn sourced_column_ids(&self, definition_id: &str) -> Vec<String> {
        self.catalogs
            .iter()
            .flat_map(|c| c.fields.iter())
            .filter(|f| f.source_field_definition_id.as_deref() == Some(definition_id))
            .map(|f| f.id.clone())
            .collect()
    }

    // ========== Field definitions ==========

    /// Create a field definition. Empty ids are generated.
    pub fn create_field_definition(&mut self, mut definition: FieldDefinition) -> Result<String, Error> {
        if definition.id.is_empty() {
            definition.id = generate_id();
        }
        if let FieldKind::Reference { sub_fields } = &mut definition.kind {
            for sub_field in sub_fields.iter_mut() {
                if sub_field.id.is_empty() {
                    sub_field.id = generate_id();
                }
            }
        }

        let mut new_ids = vec![definition.id.as_str()];
        new_ids.extend(definition.sub_fields().iter().map(|s| s.id.as_str()));
        self.ensure_ids_free(&new_ids)?;
        self.validate_kind(&definition.id, &definition.kind)?;

        let now = Utc::now();
        definition.created_at = now;
        definition.updated_at = now;

        let id = definition.id.clone();
        self.persist_definition(&definition);
        self.definitions.push(definition);
        Ok(id)
    }

    /// Update a field definition.
    ///
    /// Name and display flags always apply. Kind changes are merged under
    /// `locks`: structural changes to locked fields are dropped and listed in
    /// the returned report. A definition also counts as locked while any
    /// catalog column sourced from it is.
    pub fn update_field_definition(
        &mut self,
        id: &str,
        patch: FieldDefinitionPatch,
        locks: &dyn FieldLocks,
    ) -> Result<FieldUpdateReport, Error> {
        let index = self.definition_index(id)?;
        let mut report = FieldUpdateReport::default();

        let sourced = self.sourced_column_ids(id);
        let definition_locks = |field_id: &str| {
            locks.is_locked(field_id)
                || (field_id == id && sourced.iter().any(|column| locks.is_locked(column)))
        };

        let merged_kind = match patch.kind {
            Some(proposed) => {
                let current = &self.definitions[index];
                let mut merged =
                    policy::merge_field_kind(id, &current.kind, proposed, &definition_locks, &mut report);
                if let FieldKind::Reference { sub_fields } = &mut merged {
                    let existing: HashSet<&str> = current.sub_fields().iter().map(|s| s.id.as_str()).collect();
                    let mut added = Vec::new();
                    for sub_field in sub_fields.iter_mut() {
                        if sub_field.id.is_empty() {
                            sub_field.id = generate_id();
                        }
                        if !existing.contains(sub_field.id.as_str()) {
                            added.push(sub_field.id.clone());
                        }
                    }
                    let added: Vec<&str> = added.iter().map(String::as_str).collect();
                    self.ensure_ids_free(&added)?;
                }
                self.validate_kind(id, &merged)?;
                Some(merged)
            }
            None => None,
        };

        let kind_changed = merged_kind.is_some();
        let definition = &mut self.definitions[index];
        if let Some(name) = patch.name {
            definition.name = name;
        }
        if let Some(display) = patch.display {
            definition.display = display;
        }
        if let Some(kind) = merged_kind {
            definition.kind = kind;
        }
        definition.updated_at = Utc::now();

        let definition = definition.clone();
        self.persist_definition(&definition);
        if kind_changed {
            self.rederive_sourced_fields(id);
        }
        Ok(report)
    }

    /// Add a sub-field to a reference definition. An empty id is generated.
    pub fn add_sub_field(
        &mut self,
        definition_id: &str,
        mut sub_field: SubFieldDefinition,
    ) -> Result<String, Error> {
        let index = self.definition_index(definition_id)?;
        if sub_field.id.is_empty() {
            sub_field.id = generate_id();
        }
        self.ensure_ids_free(&[sub_field.id.as_str()])?;

        let mut proposed = self.definitions[index].kind.clone();
        match &mut proposed {
            FieldKind::Reference { sub_fields } => sub_fields.push(sub_field.clone()),
            _ => {
                return Err(Error::InvalidSchema(format!(
                    "'{}' is not a reference definition",
                    definition_id
                )))
            }
        }
        self.validate_kind(definition_id, &proposed)?;

        let definition = &mut self.definitions[index];
        definition.kind = proposed;
        definition.updated_at = Utc::now();
        let definition = definition.clone();
        self.persist_definition(&definition);
        Ok(sub_field.id)
    }

    /// Update a sub-field. Structural changes are dropped while it is locked.
    pub fn update_sub_field(
        &mut self,
        definition_id: &str,
        sub_field_id: &str,
        patch: SubFieldPatch,
        locks: &dyn FieldLocks,
    ) -> Result<FieldUpdateReport, Error> {
        let index = self.definition_index(definition_id)?;
        let mut report = FieldUpdateReport::default();

        let mut proposed = self.definitions[index].kind.clone();
        {
            let FieldKind::Reference { sub_fields } = &mut proposed else {
                return Err(Error::not_found("sub-field", sub_field_id));
            };
            let sub_field = sub_fields
                .iter_mut()
                .find(|s| s.id == sub_field_id)
                .ok_or_else(|| Error::not_found("sub-field", sub_field_id))?;

            if let Some(name) = patch.name {
                sub_field.name = name;
            }
            if let Some(required) = patch.required {
                sub_field.required = required;
            }
            if let Some(field_type) = patch.field_type {
                sub_field.field_type = policy::merge_sub_field_type(
                    sub_field_id,
                    &sub_field.field_type,
                    field_type,
                    locks,
                    &mut report,
                );
            }
        }
        self.validate_kind(definition_id, &proposed)?;

        let definition = &mut self.definitions[index];
        definition.kind = proposed;
        definition.updated_at = Utc::now();
        let definition = definition.clone();
        self.persist_definition(&definition);
        Ok(report)
    }

    /// Remove a sub-field unless it is locked.
    ///
    /// Sibling cascade rules sourced from the removed sub-field are dropped.
    pub fn remove_sub_field(
        &mut self,
        definition_id: &str,
        sub_field_id: &str,
        locks: &dyn FieldLocks,
    ) -> Result<FieldUpdateReport, Error> {
        let index = self.definition_index(definition_id)?;
        let mut report = FieldUpdateReport::default();

        if self.definitions[index].sub_field(sub_field_id).is_none() {
            return Err(Error::not_found("sub-field", sub_field_id));
        }
        if locks.is_locked(sub_field_id) {
            report.ignore(sub_field_id, [LockedAttribute::Removal]);
            return Ok(report);
        }

        let definition = &mut self.definitions[index];
        if let FieldKind::Reference { sub_fields } = &mut definition.kind {
            sub_fields.retain(|s| s.id != sub_field_id);
            for sibling in sub_fields.iter_mut() {
                let target = match &mut sibling.field_type {
                    super::SubFieldType::Reference(target) => Some(target),
                    super::SubFieldType::Multiselect { target, .. } => target.as_mut(),
                    _ => None,
                };
                if let Some(target) = target {
                    if target
                        .cascade
                        .as_ref()
                        .is_some_and(|rule| rule.source_field_id == sub_field_id)
                    {
                        target.cascade = None;
                    }
                }
            }
        }
        definition.updated_at = Utc::now();
        let definition = definition.clone();
        self.persist_definition(&definition);
        Ok(report)
    }

    /// Hide a definition from `active_field_definitions`.
    pub fn deactivate_field_definition(&mut self, id: &str) -> Result<(), Error> {
        self.set_definition_active(id, false)
    }

    /// Make a deactivated definition active again.
    pub fn reactivate_field_definition(&mut self, id: &str) -> Result<(), Error> {
        self.set_definition_active(id, true)
    }

    /// Hard-delete a definition. Callers decide whether that is allowed.
    pub(crate) fn remove_field_definition(&mut self, id: &str) -> Result<FieldDefinition, Error> {
        let index = self.definition_index(id)?;
        let removed = self.definitions.remove(index);
        record::unpersist(&*self.persistence, Namespace::FieldDefinitions, id);
        Ok(removed)
    }

    // ========== Catalogs ==========

    /// Create a catalog. Empty ids are generated; sourced column types are derived.
    pub fn create_catalog(&mut self, mut catalog: CatalogSchema) -> Result<String, Error> {
        if catalog.id.is_empty() {
            catalog.id = generate_id();
        }
        for field in catalog.fields.iter_mut() {
            if field.id.is_empty() {
                field.id = generate_id();
            }
        }

        let mut new_ids = vec![catalog.id.as_str()];
        new_ids.extend(catalog.fields.iter().map(|f| f.id.as_str()));
        self.ensure_ids_free(&new_ids)?;

        let catalog_id = catalog.id.clone();
        for field in catalog.fields.iter_mut() {
            self.derive_column_type(field)?;
            self.validate_column(&catalog_id, field)?;
        }

        let now = Utc::now();
        catalog.created_at = now;
        catalog.updated_at = now;

        self.persist_catalog(&catalog);
        self.catalogs.push(catalog);
        Ok(catalog_id)
    }

    /// Update catalog-level attributes.
    ///
    /// Sourced columns are re-derived from their current source definitions.
    pub fn update_catalog(&mut self, id: &str, patch: CatalogPatch) -> Result<(), Error> {
        let index = self.catalog_index(id)?;
        let derived: Vec<(String, CatalogFieldType)> = self.catalogs[index]
            .fields
            .iter()
            .filter_map(|f| {
                let source = self.field_definition(f.source_field_definition_id.as_deref()?)?;
                Some((f.id.clone(), CatalogFieldType::derived_from(&source.kind)))
            })
            .collect();

        let catalog = &mut self.catalogs[index];
        for (field_id, field_type) in derived {
            if let Some(field) = catalog.fields.iter_mut().find(|f| f.id == field_id) {
                field.field_type = field_type;
            }
        }
        if let Some(name) = patch.name {
            catalog.name = name;
        }
        if let Some(multiple) = patch.allows_multiple_selection {
            catalog.allows_multiple_selection = multiple;
        }
        if let Some(editable) = patch.entries_editable {
            catalog.entries_editable = editable;
        }
        catalog.updated_at = Utc::now();
        let catalog = catalog.clone();
        self.persist_catalog(&catalog);
        Ok(())
    }

    /// Add a column to a catalog. An empty id is generated.
    pub fn add_catalog_field(&mut self, catalog_id: &str, mut field: CatalogFieldDef) -> Result<String, Error> {
        let index = self.catalog_index(catalog_id)?;
        if field.id.is_empty() {
            field.id = generate_id();
        }
        self.ensure_ids_free(&[field.id.as_str()])?;
        self.derive_column_type(&mut field)?;
        self.validate_column(catalog_id, &field)?;

        let field_id = field.id.clone();
        let catalog = &mut self.catalogs[index];
        catalog.fields.push(field);
        catalog.updated_at = Utc::now();
        let catalog = catalog.clone();
        self.persist_catalog(&catalog);
        Ok(field_id)
    }

    /// Update a catalog column. Structural changes are dropped while it is locked.
    ///
    /// The type of a sourced column is derived and cannot be set directly.
    pub fn update_catalog_field(
        &mut self,
        catalog_id: &str,
        field_id: &str,
        patch: CatalogFieldPatch,
        locks: &dyn FieldLocks,
    ) -> Result<FieldUpdateReport, Error> {
        let index = self.catalog_index(catalog_id)?;
        let mut report = FieldUpdateReport::default();

        let mut field = self.catalogs[index]
            .field(field_id)
            .cloned()
            .ok_or_else(|| Error::not_found("catalog field", field_id))?;

        if let Some(name) = patch.name {
            field.name = name;
        }
        if let Some(required) = patch.required {
            field.required = required;
        }
        if let Some(field_type) = patch.field_type {
            if field.source_field_definition_id.is_some() {
                return Err(Error::InvalidSchema(format!(
                    "type of column '{}' is derived from its source definition",
                    field_id
                )));
            }
            field.field_type = policy::merge_catalog_field_type(
                field_id,
                &field.field_type,
                field_type,
                locks,
                &mut report,
            );
        }
        self.validate_column(catalog_id, &field)?;

        let catalog = &mut self.catalogs[index];
        if let Some(slot) = catalog.fields.iter_mut().find(|f| f.id == field_id) {
            *slot = field;
        }
        catalog.updated_at = Utc::now();
        let catalog = catalog.clone();
        self.persist_catalog(&catalog);
        Ok(report)
    }

    /// Remove a catalog column unless it is locked.
    pub fn remove_catalog_field(
        &mut self,
        catalog_id: &str,
        field_id: &str,
        locks: &dyn FieldLocks,
    ) -> Result<FieldUpdateReport, Error> {
        let index = self.catalog_index(catalog_id)?;
        let mut report = FieldUpdateReport::default();

        if self.catalogs[index].field(field_id).is_none() {
            return Err(Error::not_found("catalog field", field_id));
        }
        if locks.is_locked(field_id) {
            report.ignore(field_id, [LockedAttribute::Removal]);
            return Ok(report);
        }

        let catalog = &mut self.catalogs[index];
        catalog.fields.retain(|f| f.id != field_id);
        catalog.updated_at = Utc::now();
        let catalog = catalog.clone();
        self.persist_catalog(&catalog);
        Ok(report)
    }

    /// Hide a catalog from `active_catalogs`.
    pub fn deactivate_catalog(&mut self, id: &str) -> Result<(), Error> {
        self.set_catalog_active(id, false)
    }

    /// Make a deactivated catalog active again.
    pub fn reactivate_catalog(&mut self, id: &str) -> Result<(), Error> {
        self.set_catalog_active(id, true)
    }

    /// Hard-delete a catalog. Callers remove its entries.
    pub(crate) fn remove_catalog(&mut self, id: &str) -> Result<CatalogSchema, Error> {
        let index = self.catalog_index(id)?;
        let removed = self.catalogs.remove(index);
        record::unpersist(&*self.persistence, Namespace::Catalogs, id);
        Ok(removed)
    }

    /// Point a catalog-link field (definition or column) at another catalog,
    /// bypassing locks. Used once the caller has confirmed the change.
    pub(crate) fn set_catalog_target(&mut self, field_id: &str, catalog_id: &str) -> Result<(), Error> {
        if self.catalog(catalog_id).is_none() {
            return Err(Error::InvalidSchema(format!("unknown catalog '{}'", catalog_id)));
        }

        if let Some(index) = self.definitions.iter().position(|d| d.id == field_id) {
            let definition = &mut self.definitions[index];
            let FieldKind::CatalogLink { catalog_id: target, .. } = &mut definition.kind else {
                return Err(Error::InvalidSchema(format!("'{}' is not a catalog link", field_id)));
            };
            *target = catalog_id.to_string();
            definition.updated_at = Utc::now();
            let definition = definition.clone();
            self.persist_definition(&definition);
            self.rederive_sourced_fields(field_id);
            return Ok(());
        }

        let index = self
            .catalogs
            .iter()
            .position(|c| c.field(field_id).is_some())
            .ok_or_else(|| Error::not_found("catalog link field", field_id))?;
        let catalog = &mut self.catalogs[index];
        let field = catalog
            .fields
            .iter_mut()
            .find(|f| f.id == field_id)
            .ok_or_else(|| Error::not_found("catalog link field", field_id))?;
        if field.source_field_definition_id.is_some() {
            return Err(Error::InvalidSchema(format!(
                "target of column '{}' is derived from its source definition",
                field_id
            )));
        }
        let CatalogFieldType::CatalogLink { catalog_id: target, .. } = &mut field.field_type else {
            return Err(Error::InvalidSchema(format!("'{}' is not a catalog link", field_id)));
        };
        *target = catalog_id.to_string();
        catalog.updated_at = Utc::now();
        let catalog = catalog.clone();
        self.persist_catalog(&catalog);
        Ok(())
    }

    // ========== Internals ==========

    fn definition_index(&self, id: &str) -> Result<usize, Error> {
        self.definitions
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::not_found("field definition", id))
    }

    fn catalog_index(&self, id: &str) -> Result<usize, Error> {
        self.catalogs
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::not_found("catalog", id))
    }

    fn ensure_ids_free(&self, ids: &[&str]) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(*id) || self.id_in_use(id) {
                return Err(Error::DuplicateId(id.to_string()));
            }
        }
        Ok(())
    }

    /// Check link targets and cascade rules of a (proposed) kind.
    fn validate_kind(&self, definition_id: &str, kind: &FieldKind) -> Result<(), Error> {
        match kind {
            FieldKind::CatalogLink { catalog_id, .. } => {
                if self.catalog(catalog_id).is_none() {
                    return Err(Error::InvalidSchema(format!("unknown catalog '{}'", catalog_id)));
                }
            }
            FieldKind::Reference { sub_fields } => {
                for sub_field in sub_fields {
                    let Some(target) = sub_field.field_type.reference_target() else {
                        continue;
                    };
                    let target_ok = target.definition_id == definition_id
                        || self
                            .field_definition(&target.definition_id)
                            .is_some_and(|d| d.kind.is_reference());
                    if !target_ok {
                        return Err(Error::InvalidSchema(format!(
                            "sub-field '{}' targets unknown reference definition '{}'",
                            sub_field.id, target.definition_id
                        )));
                    }
                    if let Some(rule) = &target.cascade {
                        let sibling = rule.source_field_id != sub_field.id
                            && sub_fields.iter().any(|s| s.id == rule.source_field_id);
                        if !sibling {
                            return Err(Error::InvalidSchema(format!(
                                "cascade rule on '{}' names unknown sibling '{}'",
                                sub_field.id, rule.source_field_id
                            )));
                        }
                    }
                }
            }
            FieldKind::Scalar(_) | FieldKind::Select { .. } | FieldKind::Multiselect { .. } => {}
        }
        Ok(())
    }

    fn validate_column(&self, catalog_id: &str, field: &CatalogFieldDef) -> Result<(), Error> {
        if let Some((target, _)) = field.field_type.catalog_target() {
            if target != catalog_id && self.catalog(target).is_none() {
                return Err(Error::InvalidSchema(format!(
                    "column '{}' links unknown catalog '{}'",
                    field.id, target
                )));
            }
        }
        Ok(())
    }

    fn derive_column_type(&self, field: &mut CatalogFieldDef) -> Result<(), Error> {
        if let Some(source_id) = &field.source_field_definition_id {
            let source = self.field_definition(source_id).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "column '{}' is sourced from unknown definition '{}'",
                    field.id, source_id
                ))
            })?;
            field.field_type = CatalogFieldType::derived_from(&source.kind);
        }
        Ok(())
    }

    /// Re-derive the type of every column sourced from a definition.
    fn rederive_sourced_fields(&mut self, definition_id: &str) {
        let Some(kind) = self.field_definition(definition_id).map(|d| d.kind.clone()) else {
            return;
        };
        let derived = CatalogFieldType::derived_from(&kind);

        let mut touched = Vec::new();
        for catalog in self.catalogs.iter_mut() {
            let mut changed = false;
            for field in catalog.fields.iter_mut() {
                if field.source_field_definition_id.as_deref() == Some(definition_id)
                    && field.field_type != derived
                {
                    field.field_type = derived.clone();
                    changed = true;
                }
            }
            if changed {
                catalog.updated_at = Utc::now();
                touched.push(catalog.clone());
            }
        }
        for catalog in &touched {
            self.persist_catalog(catalog);
        }
    }

    fn set_definition_active(&mut self, id: &str, active: bool) -> Result<(), Error> {
        let index = self.definition_index(id)?;
        let definition = &mut self.definitions[index];
        definition.active = active;
        definition.updated_at = Utc::now();
        let definition = definition.clone();
        self.persist_definition(&definition);
        Ok(())
    }

    fn set_catalog_active(&mut self, id: &str, active: bool) -> Result<(), Error> {
        let index = self.catalog_index(id)?;
        let catalog = &mut self.catalogs[index];
        catalog.active = active;
        catalog.updated_at = Utc::now();
        let catalog = catalog.clone();
        self.persist_catalog(&catalog);
        Ok(())
    }

    fn persist_definition(&self, definition: &FieldDefinition) {
        record::persist(&*self.persistence, Namespace::FieldDefinitions, &definition.id, definition);
    }

    fn persist_catalog(&self, catalog: &CatalogSchema) {
        record::persist(&*self.persistence, Namespace::Catalogs, &catalog.id, catalog);
    }
}
