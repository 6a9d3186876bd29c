//! Command execution against a workspace.

use crate::commands::Command;
use crate::formatter::{Formatter, Rows};
use fieldbase_core::{
    DeleteOutcome, DisplayField, FieldDefinition, FieldKind, InitialState, LinkTarget,
    Relationships, StoredEntry, TargetChange, UsageRecord, Value, ValueMap, Workspace,
};
use std::collections::HashSet;
use thiserror::Error;

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Workspace operation failed.
    #[error("{0}")]
    Workspace(#[from] fieldbase_core::Error),

    /// Reading an input file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An input file is not valid JSON state.
    #[error("invalid state file: {0}")]
    Json(#[from] serde_json::Error),

    /// No reference or catalog schema has this id.
    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    /// No reference or catalog entry has this id.
    #[error("unknown entry '{0}'")]
    UnknownEntry(String),
}

/// Execute a command and return formatted output.
pub fn execute(
    workspace: &mut Workspace,
    command: Command,
    formatter: &dyn Formatter,
) -> Result<String, ExecuteError> {
    match command {
        Command::Import { file } => {
            let content = std::fs::read_to_string(&file)?;
            let state: InitialState = serde_json::from_str(&content)?;
            let message = format!(
                "imported {} field definition(s), {} catalog(s), {} entries, {} deal(s)",
                state.field_definitions.len(),
                state.catalogs.len(),
                state.reference_entries.len() + state.catalog_entries.len(),
                state.deals.len()
            );
            workspace.init(state);
            workspace.flush()?;
            Ok(formatter.format_message(&message))
        }
        Command::Schemas { all } => Ok(formatter.format_rows(&schema_rows(workspace, all))),
        Command::Entries { schema } => Ok(formatter.format_rows(&entry_rows(workspace, &schema)?)),
        Command::Resolve { entry } => Ok(formatter.format_rows(&relationship_rows(workspace, &entry)?)),
        Command::Usage { entry } => {
            let resolver = workspace.resolver();
            let usage = if workspace.reference_entry(&entry).is_some() {
                resolver.usage(&entry)
            } else if workspace.catalog_entry(&entry).is_some() {
                resolver.catalog_usage(&entry)
            } else {
                return Err(ExecuteError::UnknownEntry(entry));
            };
            Ok(formatter.format_rows(&usage_rows(&usage)))
        }
        Command::Deals { entries, linked } => {
            let mut ids: HashSet<String> = HashSet::new();
            for entry in &entries {
                if linked {
                    ids.extend(linked_ids(workspace, entry)?);
                }
                ids.insert(entry.clone());
            }
            let mut rows = Rows::new(["deal", "label"]);
            for deal in workspace.deals_referencing(&ids) {
                rows.push([deal.id.clone(), deal.label().to_string()]);
            }
            Ok(formatter.format_rows(&rows))
        }
        Command::Candidates {
            definition,
            sub_field,
            values,
        } => {
            let current: ValueMap = values
                .into_iter()
                .map(|(field, raw)| (field, parse_value(&raw)))
                .collect();
            let candidates =
                workspace
                    .cascade()
                    .candidates_for(workspace.schemas(), &definition, &sub_field, &current)?;
            let mut rows = Rows::new(["id", "display"]);
            for entry in candidates {
                rows.push([entry.id.clone(), entry.display_value.clone()]);
            }
            Ok(formatter.format_rows(&rows))
        }
        Command::Locked { field } => {
            let count = workspace.guard().value_count(&field);
            let mut rows = Rows::new(["field", "locked", "values"]);
            rows.push([field, (count > 0).to_string(), count.to_string()]);
            Ok(formatter.format_rows(&rows))
        }
        Command::Retarget {
            field,
            catalog,
            confirm,
        } => {
            let message = match workspace.change_catalog_target(&field, &catalog, confirm)? {
                TargetChange::Unchanged => format!("'{}' already targets '{}'", field, catalog),
                TargetChange::Applied { cleanup: None } => {
                    format!("'{}' now targets '{}'", field, catalog)
                }
                TargetChange::Applied {
                    cleanup: Some(report),
                } => format!(
                    "'{}' now targets '{}'; removed values from {} record(s), skipped {} malformed deal(s)",
                    field,
                    catalog,
                    report.total(),
                    report.skipped_deals
                ),
                TargetChange::ConfirmationRequired { value_count, .. } => format!(
                    "'{}' holds values in {} record(s); rerun with --confirm to purge them",
                    field, value_count
                ),
            };
            workspace.flush()?;
            Ok(formatter.format_message(&message))
        }
        Command::Delete { definition } => {
            let message = match workspace.delete_field_definition(&definition)? {
                DeleteOutcome::Deleted { entries_removed } => {
                    format!("deleted '{}' and {} entries", definition, entries_removed)
                }
                DeleteOutcome::Deactivated => {
                    format!("'{}' is in use and was deactivated", definition)
                }
            };
            workspace.flush()?;
            Ok(formatter.format_message(&message))
        }
    }
}

/// Interpret a command-line value as JSON, falling back to plain text.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw)
        .map(Value::from_json)
        .unwrap_or_else(|_| Value::text(raw))
}

fn kind_label(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Scalar(scalar) => format!("{:?}", scalar).to_lowercase(),
        FieldKind::Select { options } => format!("select ({} options)", options.len()),
        FieldKind::Multiselect { options } => format!("multiselect ({} options)", options.len()),
        FieldKind::Reference { sub_fields } => format!("reference ({} sub-fields)", sub_fields.len()),
        FieldKind::CatalogLink {
            catalog_id,
            multiple,
        } => format!("catalog link -> {}{}", catalog_id, if *multiple { " (multiple)" } else { "" }),
    }
}

fn schema_rows(workspace: &Workspace, all: bool) -> Rows {
    let schemas = workspace.schemas();
    let mut rows = Rows::new(["id", "name", "kind", "active", "locked"]);
    let guard = workspace.guard();

    let definitions: Vec<&FieldDefinition> = if all {
        schemas.field_definitions().collect()
    } else {
        schemas.active_field_definitions().collect()
    };
    for definition in definitions {
        rows.push([
            definition.id.clone(),
            definition.name.clone(),
            kind_label(&definition.kind),
            definition.active.to_string(),
            guard.definition_locked(definition).to_string(),
        ]);
    }

    for catalog in schemas.catalogs().filter(|c| all || c.active) {
        let locked = catalog.fields.iter().any(|f| guard.is_locked(&f.id));
        rows.push([
            catalog.id.clone(),
            catalog.name.clone(),
            format!("catalog ({} columns)", catalog.fields.len()),
            catalog.active.to_string(),
            locked.to_string(),
        ]);
    }
    rows
}

fn entry_rows(workspace: &Workspace, schema: &str) -> Result<Rows, ExecuteError> {
    let resolver = workspace.resolver();
    let (ids, projections): (Vec<String>, Vec<Vec<DisplayField>>) =
        if workspace.schemas().field_definition(schema).is_some() {
            let mut ids = Vec::new();
            let mut projections = Vec::new();
            for entry in workspace.reference_entries(schema) {
                projections.push(resolver.display_fields(&entry.id)?);
                ids.push(entry.id.clone());
            }
            (ids, projections)
        } else if workspace.schemas().catalog(schema).is_some() {
            let mut ids = Vec::new();
            let mut projections = Vec::new();
            for entry in workspace.catalog_entries(schema) {
                projections.push(resolver.display_catalog_fields(&entry.id)?);
                ids.push(entry.id.clone());
            }
            (ids, projections)
        } else {
            return Err(ExecuteError::UnknownSchema(schema.to_string()));
        };

    let mut headers = vec!["id".to_string()];
    if let Some(first) = projections.first() {
        headers.extend(first.iter().map(|f| f.name.clone()));
    }
    let mut rows = Rows::new(headers);
    for (id, fields) in ids.into_iter().zip(projections) {
        rows.push(std::iter::once(id).chain(fields.into_iter().map(|f| f.display)));
    }
    Ok(rows)
}

fn relationship_rows(workspace: &Workspace, entry_id: &str) -> Result<Rows, ExecuteError> {
    let resolver = workspace.resolver();
    if workspace.reference_entry(entry_id).is_some() {
        Ok(link_rows(&resolver.resolve(entry_id)?))
    } else if workspace.catalog_entry(entry_id).is_some() {
        Ok(link_rows(&resolver.resolve_catalog_entry(entry_id)?))
    } else {
        Err(ExecuteError::UnknownEntry(entry_id.to_string()))
    }
}

fn link_rows<E: StoredEntry>(links: &Relationships<&E>) -> Rows {
    let mut rows = Rows::new(["relation", "field", "schema", "id", "display"]);
    for field in &links.forward {
        for target in &field.targets {
            let (id, display) = match target {
                LinkTarget::Found(entry) => (entry.id().to_string(), entry.display_value().to_string()),
                LinkTarget::Missing(id) => (id.clone(), "(missing)".to_string()),
            };
            rows.push([
                "forward".to_string(),
                field.field_name.clone(),
                field.target_schema_id.clone(),
                id,
                display,
            ]);
        }
    }
    for group in &links.groups {
        for entry in &group.entries {
            rows.push([
                "linked".to_string(),
                String::new(),
                group.schema_id.clone(),
                entry.id().to_string(),
                entry.display_value().to_string(),
            ]);
        }
    }
    rows
}

fn usage_rows(usage: &[UsageRecord]) -> Rows {
    let mut rows = Rows::new(["entity", "name", "schema", "field"]);
    for record in usage {
        rows.push([
            record.entity_id.clone(),
            record.entity_name.clone(),
            record.schema_id.clone(),
            record.field_name.clone(),
        ]);
    }
    rows
}

fn linked_ids(workspace: &Workspace, entry_id: &str) -> Result<HashSet<String>, ExecuteError> {
    let resolver = workspace.resolver();
    if workspace.reference_entry(entry_id).is_some() {
        Ok(resolver.resolve(entry_id)?.linked_ids())
    } else if workspace.catalog_entry(entry_id).is_some() {
        Ok(resolver.resolve_catalog_entry(entry_id)?.linked_ids())
    } else {
        Err(ExecuteError::UnknownEntry(entry_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{create_formatter, OutputFormat};
    use serde_json::json;

    fn workspace() -> Workspace {
        let mut workspace = Workspace::in_memory();
        let state: InitialState = serde_json::from_value(json!({
            "field_definitions": [
                {
                    "id": "companies", "name": "Companies",
                    "kind": {"reference": {"sub_fields": [
                        {"id": "company_name", "name": "Name", "field_type": {"scalar": "text"}}
                    ]}},
                    "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
                },
                {
                    "id": "contacts", "name": "Contacts",
                    "kind": {"reference": {"sub_fields": [
                        {"id": "contact_name", "name": "Name", "field_type": {"scalar": "text"}},
                        {"id": "contact_company", "name": "Company",
                         "field_type": {"reference": {"definition_id": "companies"}}}
                    ]}},
                    "created_at": "2024-01-01T00:00:01Z", "updated_at": "2024-01-01T00:00:01Z"
                }
            ],
            "reference_entries": [
                {"id": "C1", "definition_id": "companies", "display_value": "Acme",
                 "fields": {"company_name": "Acme"},
                 "created_at": "2024-01-02T00:00:00Z", "updated_at": "2024-01-02T00:00:00Z"},
                {"id": "P1", "definition_id": "contacts", "display_value": "Bob",
                 "fields": {"contact_name": "Bob", "contact_company": "C1"},
                 "created_at": "2024-01-02T00:00:01Z", "updated_at": "2024-01-02T00:00:01Z"}
            ],
            "deal_values": {"D1": {"contact": ["P1"]}},
            "deals": [{"id": "D1", "body": {"title": "Renewal"}}]
        }))
        .unwrap();
        workspace.init(state);
        workspace
    }

    fn run(workspace: &mut Workspace, command: Command) -> serde_json::Value {
        let formatter = create_formatter(OutputFormat::Json);
        let output = execute(workspace, command, &*formatter).unwrap();
        serde_json::from_str(&output).unwrap()
    }

    #[test]
    fn test_resolve_lists_inverse_links() {
        let mut ws = workspace();
        let rows = run(
            &mut ws,
            Command::Resolve {
                entry: "C1".to_string(),
            },
        );
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["relation"], "linked");
        assert_eq!(rows[0]["id"], "P1");
    }

    #[test]
    fn test_deals_with_linked_entries() {
        let mut ws = workspace();
        let direct = run(
            &mut ws,
            Command::Deals {
                entries: vec!["C1".to_string()],
                linked: false,
            },
        );
        assert!(direct.as_array().unwrap().is_empty());

        let linked = run(
            &mut ws,
            Command::Deals {
                entries: vec!["C1".to_string()],
                linked: true,
            },
        );
        assert_eq!(linked[0]["deal"], "D1");
        assert_eq!(linked[0]["label"], "Renewal");
    }

    #[test]
    fn test_entries_project_link_labels() {
        let mut ws = workspace();
        let rows = run(
            &mut ws,
            Command::Entries {
                schema: "contacts".to_string(),
            },
        );
        assert_eq!(rows[0]["Company"], "Acme");
    }

    #[test]
    fn test_unknown_entry() {
        let mut ws = workspace();
        let formatter = create_formatter(OutputFormat::Table);
        let result = execute(
            &mut ws,
            Command::Usage {
                entry: "nope".to_string(),
            },
            &*formatter,
        );
        assert!(matches!(result, Err(ExecuteError::UnknownEntry(_))));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("C1"), Value::text("C1"));
        assert_eq!(parse_value("[\"C1\",\"C2\"]"), Value::text_list(["C1", "C2"]));
    }
}
