//! Catalog schemas: independent tables with typed columns.

use super::field::FieldKind;
use super::types::{LockedAttribute, ScalarKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An independently defined tabular schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSchema {
    /// Globally unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Columns, in display order.
    pub fields: Vec<CatalogFieldDef>,
    /// Whether links into this catalog may select several entries.
    #[serde(default)]
    pub allows_multiple_selection: bool,
    /// Whether users may edit entries after creation.
    #[serde(default = "default_true")]
    pub entries_editable: bool,
    /// Inactive catalogs are hidden from `list_active` but still resolve.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// A catalog column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFieldDef {
    /// Globally unique id; catalog entry field maps are keyed by it.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Column type. Derived when `source_field_definition_id` is set.
    pub field_type: CatalogFieldType,
    /// Whether entries must hold a non-empty value.
    #[serde(default)]
    pub required: bool,
    /// Field definition this column mirrors.
    #[serde(default)]
    pub source_field_definition_id: Option<String>,
}

/// Column type of a catalog field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogFieldType {
    /// A plain value.
    Scalar(ScalarKind),
    /// One of a fixed option list.
    Select {
        /// Allowed options.
        options: Vec<String>,
    },
    /// Any subset of a fixed option list.
    Multiselect {
        /// Allowed options.
        options: Vec<String>,
    },
    /// Entries of another catalog.
    CatalogLink {
        /// Target catalog.
        catalog_id: String,
        /// Whether several entries may be selected.
        multiple: bool,
    },
}

impl CatalogFieldType {
    /// The column type a field definition maps to.
    ///
    /// Reference definitions store entry ids, which a catalog column can
    /// only hold as text.
    pub fn derived_from(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Scalar(scalar) => CatalogFieldType::Scalar(*scalar),
            FieldKind::Select { options } => CatalogFieldType::Select {
                options: options.clone(),
            },
            FieldKind::Multiselect { options } => CatalogFieldType::Multiselect {
                options: options.clone(),
            },
            FieldKind::Reference { .. } => CatalogFieldType::Scalar(ScalarKind::Text),
            FieldKind::CatalogLink {
                catalog_id,
                multiple,
            } => CatalogFieldType::CatalogLink {
                catalog_id: catalog_id.clone(),
                multiple: *multiple,
            },
        }
    }

    /// Target catalog and multiplicity of a catalog link column.
    pub fn catalog_target(&self) -> Option<(&str, bool)> {
        match self {
            CatalogFieldType::CatalogLink {
                catalog_id,
                multiple,
            } => Some((catalog_id, *multiple)),
            _ => None,
        }
    }

    /// Structural attributes that differ between `self` and `proposed`.
    pub fn structural_diff(&self, proposed: &CatalogFieldType) -> Vec<LockedAttribute> {
        let mut diff = Vec::new();
        match (self, proposed) {
            (CatalogFieldType::Scalar(a), CatalogFieldType::Scalar(b)) => {
                if a != b {
                    diff.push(LockedAttribute::Type);
                }
            }
            (CatalogFieldType::Select { options: a }, CatalogFieldType::Select { options: b })
            | (
                CatalogFieldType::Multiselect { options: a },
                CatalogFieldType::Multiselect { options: b },
            ) => {
                if a != b {
                    diff.push(LockedAttribute::Options);
                }
            }
            (
                CatalogFieldType::CatalogLink {
                    catalog_id: a,
                    multiple: ma,
                },
                CatalogFieldType::CatalogLink {
                    catalog_id: b,
                    multiple: mb,
                },
            ) => {
                if a != b {
                    diff.push(LockedAttribute::Target);
                }
                if ma != mb {
                    diff.push(LockedAttribute::Multiplicity);
                }
            }
            _ => diff.push(LockedAttribute::Type),
        }
        diff
    }
}

impl CatalogSchema {
    /// Create an active, editable catalog with no columns.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            fields: Vec::new(),
            allows_multiple_selection: false,
            entries_editable: true,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a column.
    pub fn with_field(mut self, field: CatalogFieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Allow multiple selection.
    pub fn with_multiple_selection(mut self) -> Self {
        self.allows_multiple_selection = true;
        self
    }

    /// Look up a column by id.
    pub fn field(&self, field_id: &str) -> Option<&CatalogFieldDef> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    /// Columns whose values are catalog entry ids, with their target catalog.
    pub fn link_fields(&self) -> impl Iterator<Item = (&CatalogFieldDef, &str)> {
        self.fields
            .iter()
            .filter_map(|f| f.field_type.catalog_target().map(|(target, _)| (f, target)))
    }
}

impl CatalogFieldDef {
    /// Create an optional column.
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: CatalogFieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            required: false,
            source_field_definition_id: None,
        }
    }

    /// Create an optional scalar column.
    pub fn scalar(id: impl Into<String>, name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(id, name, CatalogFieldType::Scalar(kind))
    }

    /// Create a link column to another catalog.
    pub fn catalog_link(
        id: impl Into<String>,
        name: impl Into<String>,
        catalog_id: impl Into<String>,
        multiple: bool,
    ) -> Self {
        Self::new(
            id,
            name,
            CatalogFieldType::CatalogLink {
                catalog_id: catalog_id.into(),
                multiple,
            },
        )
    }

    /// Create a column mirroring a field definition. The type is filled in
    /// by the schema store.
    pub fn sourced(
        id: impl Into<String>,
        name: impl Into<String>,
        field_definition_id: impl Into<String>,
    ) -> Self {
        Self {
            source_field_definition_id: Some(field_definition_id.into()),
            ..Self::scalar(id, name, ScalarKind::Text)
        }
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Changes to catalog-level attributes. Always applied.
#[derive(Debug, Clone, Default)]
pub struct CatalogPatch {
    /// New name.
    pub name: Option<String>,
    /// New multiple-selection flag.
    pub allows_multiple_selection: Option<bool>,
    /// New editability flag.
    pub entries_editable: Option<bool>,
}

/// Changes to a catalog column. `None` leaves the attribute alone.
#[derive(Debug, Clone, Default)]
pub struct CatalogFieldPatch {
    /// New name.
    pub name: Option<String>,
    /// New required flag.
    pub required: Option<bool>,
    /// New type. Dropped while the column is locked and the change is structural.
    pub field_type: Option<CatalogFieldType>,
}

impl CatalogFieldPatch {
    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the required flag.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Set the type.
    pub fn field_type(mut self, field_type: CatalogFieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_types() {
        assert_eq!(
            CatalogFieldType::derived_from(&FieldKind::Scalar(ScalarKind::Date)),
            CatalogFieldType::Scalar(ScalarKind::Date)
        );
        assert_eq!(
            CatalogFieldType::derived_from(&FieldKind::Reference { sub_fields: vec![] }),
            CatalogFieldType::Scalar(ScalarKind::Text)
        );
        assert_eq!(
            CatalogFieldType::derived_from(&FieldKind::CatalogLink {
                catalog_id: "c".into(),
                multiple: true
            })
            .catalog_target(),
            Some(("c", true))
        );
    }

    #[test]
    fn test_link_fields() {
        let catalog = CatalogSchema::new("products", "Products")
            .with_field(CatalogFieldDef::scalar("sku", "SKU", ScalarKind::Text).required())
            .with_field(CatalogFieldDef::catalog_link("vendor", "Vendor", "vendors", false));

        let links: Vec<_> = catalog.link_fields().map(|(f, t)| (f.id.as_str(), t)).collect();
        assert_eq!(links, vec![("vendor", "vendors")]);
        assert!(catalog.field("sku").unwrap().required);
        assert!(catalog.entries_editable);
        assert!(!catalog.allows_multiple_selection);
    }

    #[test]
    fn test_column_diff() {
        let link = CatalogFieldType::CatalogLink {
            catalog_id: "a".into(),
            multiple: false,
        };
        assert_eq!(
            link.structural_diff(&CatalogFieldType::CatalogLink {
                catalog_id: "a".into(),
                multiple: true
            }),
            vec![LockedAttribute::Multiplicity]
        );
        assert_eq!(
            link.structural_diff(&CatalogFieldType::Scalar(ScalarKind::Text)),
            vec![LockedAttribute::Type]
        );
    }
}
