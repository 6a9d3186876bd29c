//! Record key encoding.
//!
//! Every persisted record lives under `prefix + id`, where the prefix names
//! the collection it belongs to.

use std::fmt;

/// A persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Field definitions.
    FieldDefinitions,
    /// Catalog schemas.
    Catalogs,
    /// Reference entries.
    ReferenceEntries,
    /// Catalog entries.
    CatalogEntries,
    /// Per-deal ad-hoc value maps.
    DealValues,
    /// Deal records, owned by the deals collaborator.
    Deals,
}

impl Namespace {
    /// All namespaces, in load order.
    pub const ALL: [Namespace; 6] = [
        Namespace::FieldDefinitions,
        Namespace::Catalogs,
        Namespace::ReferenceEntries,
        Namespace::CatalogEntries,
        Namespace::DealValues,
        Namespace::Deals,
    ];

    /// Stable key prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::FieldDefinitions => "field:",
            Namespace::Catalogs => "catalog:",
            Namespace::ReferenceEntries => "entry:",
            Namespace::CatalogEntries => "catalog-entry:",
            Namespace::DealValues => "deal-values:",
            Namespace::Deals => "deal:",
        }
    }

    /// Encode the storage key for a record id.
    pub fn key(&self, id: &str) -> String {
        let prefix = self.prefix();
        let mut key = String::with_capacity(prefix.len() + id.len());
        key.push_str(prefix);
        key.push_str(id);
        key
    }

    /// Decode a storage key back to its id, if it belongs to this namespace.
    pub fn decode<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::FieldDefinitions => "field_definitions",
            Namespace::Catalogs => "catalogs",
            Namespace::ReferenceEntries => "reference_entries",
            Namespace::CatalogEntries => "catalog_entries",
            Namespace::DealValues => "deal_values",
            Namespace::Deals => "deals",
        };
        write!(f, "{}", name)
    }
}

/// Generate a new record id (UUID v4, hyphenated).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
