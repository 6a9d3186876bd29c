//! Required-field validation and display value derivation.

use crate::error::Error;
use crate::schema::{CatalogSchema, FieldDefinition};
use crate::value::{Value, ValueMap};

/// Where the values of a column point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLink<'a> {
    /// Ids of entries of a reference definition.
    Reference(&'a str),
    /// Ids of entries of a catalog.
    Catalog(&'a str),
}

/// A column of an entry schema, flattened for validation and display.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    /// Field id; entry maps are keyed by it.
    pub id: &'a str,
    /// Display name.
    pub name: &'a str,
    /// Whether entries must hold a non-empty value.
    pub required: bool,
    /// Link target, when values are entry ids.
    pub link: Option<ColumnLink<'a>>,
}

/// A schema that entries are created against.
pub trait EntrySchema {
    /// Columns in display order.
    fn columns(&self) -> Vec<Column<'_>>;
}

impl EntrySchema for FieldDefinition {
    fn columns(&self) -> Vec<Column<'_>> {
        self.sub_fields()
            .iter()
            .map(|s| Column {
                id: &s.id,
                name: &s.name,
                required: s.required,
                link: s
                    .field_type
                    .reference_target()
                    .map(|t| ColumnLink::Reference(&t.definition_id)),
            })
            .collect()
    }
}

impl EntrySchema for CatalogSchema {
    fn columns(&self) -> Vec<Column<'_>> {
        self.fields
            .iter()
            .map(|f| Column {
                id: &f.id,
                name: &f.name,
                required: f.required,
                link: f
                    .field_type
                    .catalog_target()
                    .map(|(catalog_id, _)| ColumnLink::Catalog(catalog_id)),
            })
            .collect()
    }
}

/// Ids of required columns whose value is empty or absent.
pub fn missing_required(schema: &dyn EntrySchema, fields: &ValueMap) -> Vec<String> {
    schema
        .columns()
        .into_iter()
        .filter(|c| c.required && fields.get(c.id).map_or(true, Value::is_empty))
        .map(|c| c.id.to_string())
        .collect()
}

/// Validate a reference entry's field map against its definition.
pub fn validate_reference_fields(definition: &FieldDefinition, fields: &ValueMap) -> Result<(), Error> {
    check(missing_required(definition, fields))
}

/// Validate a catalog entry's field map against its catalog.
pub fn validate_catalog_fields(catalog: &CatalogSchema, fields: &ValueMap) -> Result<(), Error> {
    check(missing_required(catalog, fields))
}

fn check(missing: Vec<String>) -> Result<(), Error> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation { missing })
    }
}

/// Derive a label for an entry: the first non-empty required column, else the
/// first non-empty column, stringified. Empty when nothing is set.
pub fn derive_display_value(schema: &dyn EntrySchema, fields: &ValueMap) -> String {
    let columns = schema.columns();
    let value_of = |c: &Column<'_>| fields.get(c.id).filter(|v| !v.is_empty());

    columns
        .iter()
        .filter(|c| c.required)
        .find_map(value_of)
        .or_else(|| columns.iter().find_map(value_of))
        .map(Value::display)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CatalogFieldDef, ReferenceTarget, ScalarKind, SubFieldDefinition};

    fn contacts() -> FieldDefinition {
        FieldDefinition::reference("contacts", "Contacts")
            .with_sub_field(SubFieldDefinition::scalar("nickname", "Nickname", ScalarKind::Text))
            .with_sub_field(SubFieldDefinition::scalar("name", "Name", ScalarKind::Text).required())
            .with_sub_field(
                SubFieldDefinition::reference("company", "Company", ReferenceTarget::new("companies"))
                    .required(),
            )
    }

    fn map(pairs: &[(&str, Value)]) -> ValueMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_missing_required_lists_empty_values() {
        let fields = map(&[("name", Value::text("")), ("nickname", Value::text("B"))]);
        assert_eq!(missing_required(&contacts(), &fields), vec!["name", "company"]);

        let err = validate_reference_fields(&contacts(), &fields).unwrap_err();
        assert!(matches!(err, Error::Validation { missing } if missing.len() == 2));
    }

    #[test]
    fn test_empty_list_counts_as_missing() {
        let catalog = CatalogSchema::new("vendors", "Vendors")
            .with_field(CatalogFieldDef::catalog_link("tags", "Tags", "tags", true).required());
        assert!(validate_catalog_fields(&catalog, &map(&[("tags", Value::List(vec![]))])).is_err());
        assert!(validate_catalog_fields(&catalog, &map(&[("tags", Value::text_list(["t1"]))])).is_ok());
    }

    #[test]
    fn test_display_value_prefers_required() {
        let fields = map(&[("nickname", Value::text("Bobby")), ("name", Value::text("Bob"))]);
        assert_eq!(derive_display_value(&contacts(), &fields), "Bob");

        let fields = map(&[("nickname", Value::text("Bobby"))]);
        assert_eq!(derive_display_value(&contacts(), &fields), "Bobby");

        assert_eq!(derive_display_value(&contacts(), &ValueMap::new()), "");
    }

    #[test]
    fn test_columns_carry_links() {
        let def = contacts();
        let columns = def.columns();
        assert_eq!(columns[2].link, Some(ColumnLink::Reference("companies")));
        assert_eq!(columns[0].link, None);
    }
}
