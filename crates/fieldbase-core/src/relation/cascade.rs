//! Dependent-dropdown filtering.

use crate::entry::{EntryStore, ReferenceEntry, StoredEntry};
use crate::error::Error;
use crate::schema::SchemaStore;
use crate::value::{Value, ValueMap};

/// Narrows a definition's entries by one of their field values.
pub struct CascadeFilter<'a> {
    entries: &'a EntryStore,
}

impl<'a> CascadeFilter<'a> {
    /// Create a filter over an entry store.
    pub fn new(entries: &'a EntryStore) -> Self {
        Self { entries }
    }

    /// Entries of `target_definition_id` whose `constraint_field_id` matches
    /// `constraint_value`, by equality or collection membership.
    ///
    /// An absent field, or an absent or empty value, yields every entry of the
    /// definition.
    pub fn filter(
        &self,
        target_definition_id: &str,
        constraint_field_id: Option<&str>,
        constraint_value: Option<&Value>,
    ) -> Vec<&'a ReferenceEntry> {
        let candidates = self.entries.reference_entries(target_definition_id);
        match (constraint_field_id, constraint_value) {
            (Some(field_id), Some(value)) if !value.is_empty() => candidates
                .filter(|e| e.value(field_id).matches(value))
                .collect(),
            _ => candidates.collect(),
        }
    }

    /// Selectable entries for a reference sub-field, given the values
    /// currently entered on the record being edited.
    ///
    /// Sub-fields with a cascade rule are narrowed by their sibling's
    /// current value; others list every entry of the target definition.
    pub fn candidates_for(
        &self,
        schemas: &SchemaStore,
        definition_id: &str,
        sub_field_id: &str,
        current: &ValueMap,
    ) -> Result<Vec<&'a ReferenceEntry>, Error> {
        let definition = schemas
            .field_definition(definition_id)
            .ok_or_else(|| Error::not_found("field definition", definition_id))?;
        let sub_field = definition
            .sub_field(sub_field_id)
            .ok_or_else(|| Error::not_found("sub-field", sub_field_id))?;
        let target = sub_field.field_type.reference_target().ok_or_else(|| {
            Error::InvalidSchema(format!("sub-field '{}' does not reference entries", sub_field_id))
        })?;

        Ok(match &target.cascade {
            Some(rule) => self.filter(
                &target.definition_id,
                Some(&rule.target_field_id),
                current.get(&rule.source_field_id),
            ),
            None => self.filter(&target.definition_id, None, None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ReferenceEntry;
    use crate::schema::{CascadeRule, FieldDefinition, ReferenceTarget, ScalarKind, SubFieldDefinition};
    use crate::storage::MemoryPersistence;
    use std::sync::Arc;

    fn map(pairs: &[(&str, Value)]) -> ValueMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn entries() -> EntryStore {
        let mut entries = EntryStore::new(Arc::new(MemoryPersistence::new()));
        for (id, company) in [("p1", Value::text("c1")), ("p2", Value::text_list(["c1", "c2"])), ("p3", Value::text("c2"))] {
            entries
                .insert_reference_entry(ReferenceEntry::new(id, "contacts", id, map(&[("contact_company", company)])))
                .unwrap();
        }
        entries
            .insert_reference_entry(ReferenceEntry::new("p4", "contacts", "p4", ValueMap::new()))
            .unwrap();
        entries
    }

    fn ids(found: Vec<&ReferenceEntry>) -> Vec<&str> {
        found.into_iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_filter_by_value_and_membership() {
        let entries = entries();
        let filter = CascadeFilter::new(&entries);
        assert_eq!(
            ids(filter.filter("contacts", Some("contact_company"), Some(&Value::text("c1")))),
            vec!["p1", "p2"]
        );
        assert_eq!(
            ids(filter.filter("contacts", Some("contact_company"), Some(&Value::text_list(["c2"])))),
            vec!["p2", "p3"]
        );
    }

    #[test]
    fn test_absent_constraint_is_unfiltered() {
        let entries = entries();
        let filter = CascadeFilter::new(&entries);
        assert_eq!(filter.filter("contacts", None, Some(&Value::text("c1"))).len(), 4);
        assert_eq!(filter.filter("contacts", Some("contact_company"), None).len(), 4);
        assert_eq!(filter.filter("contacts", Some("contact_company"), Some(&Value::text(""))).len(), 4);
        assert!(filter.filter("contacts", Some("contact_company"), Some(&Value::text("c9"))).is_empty());
    }

    #[test]
    fn test_candidates_follow_cascade_rule() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut schemas = SchemaStore::new(persistence);
        schemas
            .create_field_definition(FieldDefinition::reference("companies", "Companies"))
            .unwrap();
        schemas
            .create_field_definition(
                FieldDefinition::reference("contacts", "Contacts").with_sub_field(SubFieldDefinition::reference(
                    "contact_company",
                    "Company",
                    ReferenceTarget::new("companies"),
                )),
            )
            .unwrap();
        schemas
            .create_field_definition(
                FieldDefinition::reference("orders", "Orders")
                    .with_sub_field(SubFieldDefinition::scalar("order_no", "No.", ScalarKind::Text))
                    .with_sub_field(SubFieldDefinition::reference(
                        "order_company",
                        "Company",
                        ReferenceTarget::new("companies"),
                    ))
                    .with_sub_field(SubFieldDefinition::reference(
                        "order_contact",
                        "Contact",
                        ReferenceTarget::new("contacts")
                            .with_cascade(CascadeRule::new("order_company", "contact_company")),
                    )),
            )
            .unwrap();

        let entries = entries();
        let filter = CascadeFilter::new(&entries);

        let current = map(&[("order_company", Value::text("c2"))]);
        let found = filter.candidates_for(&schemas, "orders", "order_contact", &current).unwrap();
        assert_eq!(ids(found), vec!["p2", "p3"]);

        let found = filter.candidates_for(&schemas, "orders", "order_contact", &ValueMap::new()).unwrap();
        assert_eq!(found.len(), 4);

        assert!(matches!(
            filter.candidates_for(&schemas, "orders", "order_no", &current),
            Err(Error::InvalidSchema(_))
        ));
    }
}
