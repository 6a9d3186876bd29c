//! Fieldbase Core - runtime schemas, entries and relationship resolution.
//!
//! This crate provides the engine behind user-defined custom fields: a
//! mutable schema store, schema-agnostic entry storage, read-time link
//! discovery, lock rules for schema edits, and the deal linkage scanner.

pub mod deal;
pub mod entry;
pub mod error;
pub mod guard;
pub mod relation;
pub mod schema;
pub mod storage;
pub mod value;
pub mod workspace;

pub use deal::{
    DealDirectory, DealLinkageScanner, DealRecord, DealValueSource, DealValueStore, DealValues,
    PersistedDeals,
};
pub use entry::{
    derive_display_value, validate_catalog_fields, validate_reference_fields, CatalogEntry,
    EntryPatch, EntryStore, ReferenceEntry, StoredEntry,
};
pub use error::Error;
pub use guard::{CleanupReport, FieldLocks, MutationGuard, NoLocks};
pub use relation::{
    CascadeFilter, DisplayField, ForwardField, LinkGroup, LinkTarget, RelationshipResolver,
    Relationships, UsageRecord,
};
pub use schema::{
    CascadeRule, CatalogFieldDef, CatalogFieldPatch, CatalogFieldType, CatalogPatch, CatalogSchema,
    DisplayFlags, FieldDefinition, FieldDefinitionPatch, FieldKind, FieldUpdateReport,
    LockedAttribute, ReferenceTarget, ScalarKind, SchemaStore, SubFieldDefinition, SubFieldPatch,
    SubFieldType,
};
pub use storage::{MemoryPersistence, Persistence, SledPersistence, StoreConfig};
pub use value::{Value, ValueMap};
pub use workspace::{DeleteOutcome, InitialState, TargetChange, Workspace};
