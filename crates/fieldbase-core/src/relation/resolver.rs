//! Forward and inverse link discovery.

use super::{ForwardField, GroupBuilder, LinkTarget, Relationships, UsageRecord};
use crate::entry::{CatalogEntry, ColumnLink, EntrySchema, EntryStore, ReferenceEntry, StoredEntry};
use crate::error::Error;
use crate::schema::SchemaStore;
use crate::value::Value;
use tracing::debug;

/// A stored value projected onto the current schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayField {
    /// Field id.
    pub field_id: String,
    /// Field name.
    pub name: String,
    /// Stored value; null when the entry has none.
    pub value: Value,
    /// Rendered value. Entry ids show the target's display value, or the id
    /// itself when the target is gone.
    pub display: String,
}

/// Resolves relationships over a snapshot of the schema and entry stores.
pub struct RelationshipResolver<'a> {
    schemas: &'a SchemaStore,
    entries: &'a EntryStore,
}

impl<'a> RelationshipResolver<'a> {
    /// Create a resolver.
    pub fn new(schemas: &'a SchemaStore, entries: &'a EntryStore) -> Self {
        Self { schemas, entries }
    }

    /// Resolve a reference entry's forward and inverse links.
    ///
    /// Forward links follow the reference sub-fields of the entry's own
    /// definition, active or not. Inverse links come from a full scan of the
    /// entries of every active reference definition.
    pub fn resolve(&self, entry_id: &str) -> Result<Relationships<&'a ReferenceEntry>, Error> {
        let entry = self
            .entries
            .reference_entry(entry_id)
            .ok_or_else(|| Error::not_found("reference entry", entry_id))?;

        let mut forward = Vec::new();
        let mut groups = GroupBuilder::new();

        if let Some(definition) = self.schemas.field_definition(&entry.definition_id) {
            for (sub_field, target) in definition.link_sub_fields() {
                let value = entry.value(&sub_field.id);
                if value.is_empty() {
                    continue;
                }
                let targets: Vec<_> = value
                    .ids()
                    .map(|id| match self.entries.reference_entry(id) {
                        Some(found) => LinkTarget::Found(found),
                        None => LinkTarget::Missing(id.to_string()),
                    })
                    .collect();
                for found in targets.iter().filter_map(LinkTarget::found) {
                    groups.add(&found.definition_id, *found);
                }
                forward.push(ForwardField {
                    field_id: sub_field.id.clone(),
                    field_name: sub_field.name.clone(),
                    target_schema_id: target.definition_id.clone(),
                    targets,
                });
            }
        }

        let mut scanned = 0usize;
        for definition in self.schemas.active_field_definitions() {
            let link_fields: Vec<_> = definition.link_sub_fields().map(|(s, _)| s.id.as_str()).collect();
            if link_fields.is_empty() {
                continue;
            }
            for candidate in self.entries.reference_entries(&definition.id) {
                scanned += 1;
                if candidate.id == entry_id {
                    continue;
                }
                if link_fields.iter().any(|f| candidate.value(f).contains_id(entry_id)) {
                    groups.add(&candidate.definition_id, candidate);
                }
            }
        }
        debug!(entry_id, scanned, "resolved reference entry links");

        Ok(Relationships {
            entry_id: entry_id.to_string(),
            forward,
            groups: groups.finish(),
        })
    }

    /// Resolve a catalog entry's forward and inverse links over catalog-link
    /// columns.
    pub fn resolve_catalog_entry(&self, entry_id: &str) -> Result<Relationships<&'a CatalogEntry>, Error> {
        let entry = self
            .entries
            .catalog_entry(entry_id)
            .ok_or_else(|| Error::not_found("catalog entry", entry_id))?;

        let mut forward = Vec::new();
        let mut groups = GroupBuilder::new();

        if let Some(catalog) = self.schemas.catalog(&entry.catalog_id) {
            for (field, target) in catalog.link_fields() {
                let value = entry.value(&field.id);
                if value.is_empty() {
                    continue;
                }
                let targets: Vec<_> = value
                    .ids()
                    .map(|id| match self.entries.catalog_entry(id) {
                        Some(found) => LinkTarget::Found(found),
                        None => LinkTarget::Missing(id.to_string()),
                    })
                    .collect();
                for found in targets.iter().filter_map(LinkTarget::found) {
                    groups.add(&found.catalog_id, *found);
                }
                forward.push(ForwardField {
                    field_id: field.id.clone(),
                    field_name: field.name.clone(),
                    target_schema_id: target.to_string(),
                    targets,
                });
            }
        }

        for catalog in self.schemas.active_catalogs() {
            let link_fields: Vec<_> = catalog.link_fields().map(|(f, _)| f.id.as_str()).collect();
            if link_fields.is_empty() {
                continue;
            }
            for candidate in self.entries.catalog_entries(&catalog.id) {
                if candidate.id == entry_id {
                    continue;
                }
                if link_fields.iter().any(|f| candidate.value(f).contains_id(entry_id)) {
                    groups.add(&candidate.catalog_id, candidate);
                }
            }
        }

        Ok(Relationships {
            entry_id: entry_id.to_string(),
            forward,
            groups: groups.finish(),
        })
    }

    /// Every reference entry field that stores `entry_id`.
    ///
    /// Covers all definitions, active or not. Deal value maps are not
    /// consulted.
    pub fn usage(&self, entry_id: &str) -> Vec<UsageRecord> {
        let mut usage = Vec::new();
        for definition in self.schemas.field_definitions() {
            let link_fields: Vec<_> = definition.link_sub_fields().map(|(s, _)| s).collect();
            if link_fields.is_empty() {
                continue;
            }
            for candidate in self.entries.reference_entries(&definition.id) {
                for field in &link_fields {
                    if candidate.value(&field.id).contains_id(entry_id) {
                        usage.push(UsageRecord {
                            entity_id: candidate.id.clone(),
                            entity_name: candidate.display_value.clone(),
                            schema_id: definition.id.clone(),
                            field_id: field.id.clone(),
                            field_name: field.name.clone(),
                        });
                    }
                }
            }
        }
        usage
    }

    /// Every catalog entry column that stores `entry_id`.
    pub fn catalog_usage(&self, entry_id: &str) -> Vec<UsageRecord> {
        let mut usage = Vec::new();
        for catalog in self.schemas.catalogs() {
            let link_fields: Vec<_> = catalog.link_fields().map(|(f, _)| f).collect();
            if link_fields.is_empty() {
                continue;
            }
            for candidate in self.entries.catalog_entries(&catalog.id) {
                for field in &link_fields {
                    if candidate.value(&field.id).contains_id(entry_id) {
                        usage.push(UsageRecord {
                            entity_id: candidate.id.clone(),
                            entity_name: candidate.display_value.clone(),
                            schema_id: catalog.id.clone(),
                            field_id: field.id.clone(),
                            field_name: field.name.clone(),
                        });
                    }
                }
            }
        }
        usage
    }

    /// Project a reference entry onto its definition as it is now.
    ///
    /// Stored keys the definition no longer has are ignored; columns the
    /// entry has no value for come back null.
    pub fn display_fields(&self, entry_id: &str) -> Result<Vec<DisplayField>, Error> {
        let entry = self
            .entries
            .reference_entry(entry_id)
            .ok_or_else(|| Error::not_found("reference entry", entry_id))?;
        Ok(match self.schemas.field_definition(&entry.definition_id) {
            Some(definition) => self.project(definition, entry),
            None => Vec::new(),
        })
    }

    /// Project a catalog entry onto its catalog as it is now.
    pub fn display_catalog_fields(&self, entry_id: &str) -> Result<Vec<DisplayField>, Error> {
        let entry = self
            .entries
            .catalog_entry(entry_id)
            .ok_or_else(|| Error::not_found("catalog entry", entry_id))?;
        Ok(match self.schemas.catalog(&entry.catalog_id) {
            Some(catalog) => self.project(catalog, entry),
            None => Vec::new(),
        })
    }

    fn project<E: StoredEntry>(&self, schema: &dyn EntrySchema, entry: &E) -> Vec<DisplayField> {
        schema
            .columns()
            .into_iter()
            .map(|column| {
                let value = entry.value(column.id).clone();
                let display = match column.link {
                    Some(link) => value
                        .ids()
                        .map(|id| self.label(link, id))
                        .collect::<Vec<_>>()
                        .join(", "),
                    None => value.display(),
                };
                DisplayField {
                    field_id: column.id.to_string(),
                    name: column.name.to_string(),
                    value,
                    display,
                }
            })
            .collect()
    }

    fn label(&self, link: ColumnLink<'_>, id: &str) -> String {
        let display = match link {
            ColumnLink::Reference(_) => self.entries.reference_entry(id).map(|e| e.display_value.as_str()),
            ColumnLink::Catalog(_) => self.entries.catalog_entry(id).map(|e| e.display_value.as_str()),
        };
        display.unwrap_or(id).to_string()
    }
}
