//! Entry records.

use crate::storage::Namespace;
use crate::value::{Value, ValueMap};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An instance of a reference field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// Unique entry id.
    pub id: String,
    /// The reference definition this entry was created against.
    pub definition_id: String,
    /// Caller-derived label.
    pub display_value: String,
    /// Values keyed by sub-field id.
    #[serde(default)]
    pub fields: ValueMap,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Who created the entry, if known.
    #[serde(default)]
    pub created_by: Option<String>,
}

/// An instance of a catalog schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique entry id.
    pub id: String,
    /// The catalog this entry belongs to.
    pub catalog_id: String,
    /// Caller-derived label.
    pub display_value: String,
    /// Values keyed by catalog field id.
    #[serde(default)]
    pub fields: ValueMap,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl ReferenceEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        definition_id: impl Into<String>,
        display_value: impl Into<String>,
        fields: ValueMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            definition_id: definition_id.into(),
            display_value: display_value.into(),
            fields,
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    /// Set the author.
    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }
}

impl CatalogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        catalog_id: impl Into<String>,
        display_value: impl Into<String>,
        fields: ValueMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            catalog_id: catalog_id.into(),
            display_value: display_value.into(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Common shape of reference and catalog entries.
pub trait StoredEntry: Clone + Serialize + DeserializeOwned {
    /// Where records of this kind are persisted.
    const NAMESPACE: Namespace;
    /// Name used in `NotFound` errors.
    const KIND: &'static str;

    /// Entry id.
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    /// Owning schema id (definition or catalog).
    fn owner_id(&self) -> &str;
    /// Caller-derived label.
    fn display_value(&self) -> &str;
    fn set_display_value(&mut self, display_value: String);
    /// Field values.
    fn fields(&self) -> &ValueMap;
    fn fields_mut(&mut self) -> &mut ValueMap;
    fn created_at(&self) -> DateTime<Utc>;
    /// Stamp creation and modification times.
    fn stamp(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);
    /// Stamp the modification time.
    fn touch(&mut self, updated_at: DateTime<Utc>);

    /// Value of a field; null when absent.
    fn value(&self, field_id: &str) -> &Value {
        self.fields().get(field_id).unwrap_or(&Value::Null)
    }
}

macro_rules! impl_stored_entry {
    ($ty:ty, $namespace:expr, $kind:literal, $owner:ident) => {
        impl StoredEntry for $ty {
            const NAMESPACE: Namespace = $namespace;
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn owner_id(&self) -> &str {
                &self.$owner
            }

            fn display_value(&self) -> &str {
                &self.display_value
            }

            fn set_display_value(&mut self, display_value: String) {
                self.display_value = display_value;
            }

            fn fields(&self) -> &ValueMap {
                &self.fields
            }

            fn fields_mut(&mut self) -> &mut ValueMap {
                &mut self.fields
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn stamp(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
                self.created_at = created_at;
                self.updated_at = updated_at;
            }

            fn touch(&mut self, updated_at: DateTime<Utc>) {
                self.updated_at = updated_at;
            }
        }
    };
}

impl_stored_entry!(ReferenceEntry, Namespace::ReferenceEntries, "reference entry", definition_id);
impl_stored_entry!(CatalogEntry, Namespace::CatalogEntries, "catalog entry", catalog_id);

/// Partial update of an entry.
///
/// Listed fields are merged into the stored map; unlisted fields are kept.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    /// New display value.
    pub display_value: Option<String>,
    /// Field values to set.
    pub fields: ValueMap,
}

impl EntryPatch {
    /// Set the display value.
    pub fn display_value(mut self, display_value: impl Into<String>) -> Self {
        self.display_value = Some(display_value.into());
        self
    }

    /// Set a field value.
    pub fn set(mut self, field_id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field_id.into(), value.into());
        self
    }

    /// Apply to a field map.
    pub fn merge_into(&self, fields: &mut ValueMap) {
        for (field_id, value) in &self.fields {
            fields.insert(field_id.clone(), value.clone());
        }
    }
}
