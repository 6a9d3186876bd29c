//! Runtime-mutable schema for fieldbase.
//!
//! Two kinds of schema live here: field definitions (simple fields, reference
//! catalogs with nested sub-fields, catalog links) and catalog schemas
//! (independent tables with typed columns).

mod catalog;
mod field;
mod store;
mod types;

pub use catalog::{CatalogFieldDef, CatalogFieldPatch, CatalogFieldType, CatalogPatch, CatalogSchema};
pub use field::{
    CascadeRule, DisplayFlags, FieldDefinition, FieldDefinitionPatch, FieldKind, ReferenceTarget,
    SubFieldDefinition, SubFieldPatch, SubFieldType,
};
pub use store::SchemaStore;
pub use types::{FieldUpdateReport, IgnoredChange, LockedAttribute, ScalarKind};
