//! Core type definitions shared by field definitions and catalog schemas.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Plain value types a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    /// Single-line text.
    Text,
    /// Multi-line text.
    LongText,
    /// Number.
    Number,
    /// Calendar date.
    Date,
    /// Yes/no.
    Boolean,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// URL.
    Url,
}

/// A structural attribute of a field that cannot change while data depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockedAttribute {
    /// The field's type (kind) itself.
    Type,
    /// Select/multiselect option list.
    Options,
    /// Target definition or target catalog.
    Target,
    /// Single vs. multiple selection.
    Multiplicity,
    /// The field's existence (removal).
    Removal,
}

impl fmt::Display for LockedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockedAttribute::Type => write!(f, "type"),
            LockedAttribute::Options => write!(f, "options"),
            LockedAttribute::Target => write!(f, "target"),
            LockedAttribute::Multiplicity => write!(f, "multiplicity"),
            LockedAttribute::Removal => write!(f, "removal"),
        }
    }
}

/// A structural change that was dropped from an update because the field is locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredChange {
    /// The locked field (definition, sub-field, or catalog column id).
    pub field_id: String,
    /// The attribute whose change was dropped.
    pub attribute: LockedAttribute,
}

/// Outcome of a guarded schema update.
///
/// Free attributes are always applied; anything listed in `ignored` was left
/// as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdateReport {
    /// Structural changes that were not applied.
    pub ignored: Vec<IgnoredChange>,
}

impl FieldUpdateReport {
    /// Check that every requested change was applied.
    pub fn is_clean(&self) -> bool {
        self.ignored.is_empty()
    }

    /// Attributes ignored for the given field.
    pub fn ignored_for(&self, field_id: &str) -> Vec<LockedAttribute> {
        self.ignored
            .iter()
            .filter(|c| c.field_id == field_id)
            .map(|c| c.attribute)
            .collect()
    }

    pub(crate) fn ignore(&mut self, field_id: &str, attributes: impl IntoIterator<Item = LockedAttribute>) {
        for attribute in attributes {
            self.ignored.push(IgnoredChange {
                field_id: field_id.to_string(),
                attribute,
            });
        }
    }
}
