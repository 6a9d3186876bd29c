//! Relationship resolution between entries.
//!
//! Links are discovered at read time from stored values: nothing is indexed
//! and nothing is enforced at write time. Ids that no longer resolve are
//! reported as [`LinkTarget::Missing`] instead of failing.

mod cascade;
mod resolver;

pub use cascade::CascadeFilter;
pub use resolver::{DisplayField, RelationshipResolver};

use std::collections::HashSet;

/// A stored id, resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget<T> {
    /// The entry exists.
    Found(T),
    /// Nothing has this id any more.
    Missing(String),
}

impl<T> LinkTarget<T> {
    /// The resolved entry, if any.
    pub fn found(&self) -> Option<&T> {
        match self {
            LinkTarget::Found(entry) => Some(entry),
            LinkTarget::Missing(_) => None,
        }
    }

    /// Check if the id did not resolve.
    pub fn is_missing(&self) -> bool {
        matches!(self, LinkTarget::Missing(_))
    }
}

/// The targets of one link field of the resolved entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardField<T> {
    /// Link field id (sub-field or catalog column).
    pub field_id: String,
    /// Link field name.
    pub field_name: String,
    /// Schema the field points into (definition or catalog id).
    pub target_schema_id: String,
    /// One target per stored id, in stored order.
    pub targets: Vec<LinkTarget<T>>,
}

/// Linked entries belonging to one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkGroup<T> {
    /// Definition or catalog id.
    pub schema_id: String,
    /// Entries, forward-discovered first, each once.
    pub entries: Vec<T>,
}

/// Everything linked to one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationships<T> {
    /// The resolved entry.
    pub entry_id: String,
    /// Per-field forward links, including ids that no longer resolve.
    pub forward: Vec<ForwardField<T>>,
    /// Forward and inverse links merged and grouped by schema.
    pub groups: Vec<LinkGroup<T>>,
}

impl<T> Relationships<T> {
    /// The group for a schema, if any entry of it is linked.
    pub fn group(&self, schema_id: &str) -> Option<&LinkGroup<T>> {
        self.groups.iter().find(|g| g.schema_id == schema_id)
    }

    /// Check if nothing is linked.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<T: LinkedEntry> Relationships<T> {
    /// Ids of every linked entry.
    pub fn linked_ids(&self) -> HashSet<String> {
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter().map(|e| e.entry_id().to_string()))
            .collect()
    }
}

/// Entry types that can appear in link groups.
pub trait LinkedEntry {
    /// Entry id.
    fn entry_id(&self) -> &str;
}

impl<T: crate::entry::StoredEntry> LinkedEntry for &T {
    fn entry_id(&self) -> &str {
        self.id()
    }
}

/// One place an entry id is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    /// The entry holding the id.
    pub entity_id: String,
    /// Its display value.
    pub entity_name: String,
    /// Schema of the holding entry (definition or catalog id).
    pub schema_id: String,
    /// Field holding the id.
    pub field_id: String,
    /// That field's name.
    pub field_name: String,
}

/// Accumulates link groups, keeping first-seen order and dropping repeats.
pub(crate) struct GroupBuilder<T> {
    groups: Vec<LinkGroup<T>>,
    seen: HashSet<String>,
}

impl<T: LinkedEntry> GroupBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            groups: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub(crate) fn add(&mut self, schema_id: &str, entry: T) {
        if !self.seen.insert(entry.entry_id().to_string()) {
            return;
        }
        match self.groups.iter_mut().find(|g| g.schema_id == schema_id) {
            Some(group) => group.entries.push(entry),
            None => self.groups.push(LinkGroup {
                schema_id: schema_id.to_string(),
                entries: vec![entry],
            }),
        }
    }

    pub(crate) fn finish(self) -> Vec<LinkGroup<T>> {
        self.groups
    }
}
