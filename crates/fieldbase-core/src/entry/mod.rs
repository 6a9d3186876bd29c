//! Reference and catalog entries.

mod store;
mod types;
mod validate;

pub use store::EntryStore;
pub use types::{CatalogEntry, EntryPatch, ReferenceEntry, StoredEntry};
pub use validate::{
    derive_display_value, missing_required, validate_catalog_fields, validate_reference_fields, Column,
    ColumnLink, EntrySchema,
};
