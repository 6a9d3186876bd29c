//! Merge rules for schema edits on locked fields.
//!
//! A proposed change is split into free attributes (always applied) and
//! structural attributes (applied only while the field is unlocked). Dropped
//! structural changes are recorded in a [`FieldUpdateReport`].

use crate::schema::{
    CatalogFieldType, FieldKind, FieldUpdateReport, LockedAttribute, SubFieldDefinition,
    SubFieldType,
};

/// Answers whether live data depends on a field.
pub trait FieldLocks {
    /// Check if any record holds a non-empty value for the field id.
    fn is_locked(&self, field_id: &str) -> bool;
}

impl<F> FieldLocks for F
where
    F: Fn(&str) -> bool,
{
    fn is_locked(&self, field_id: &str) -> bool {
        self(field_id)
    }
}

/// Treats every field as unlocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocks;

impl FieldLocks for NoLocks {
    fn is_locked(&self, _field_id: &str) -> bool {
        false
    }
}

/// Merge a proposed definition kind into the current one.
///
/// For reference definitions each sub-field is merged on its own lock; for
/// everything else the definition is locked if its own id is, or if any of
/// its current sub-fields is (switching a used reference catalog to another
/// kind would orphan its entries' values).
pub(crate) fn merge_field_kind(
    definition_id: &str,
    current: &FieldKind,
    proposed: FieldKind,
    locks: &dyn FieldLocks,
    report: &mut FieldUpdateReport,
) -> FieldKind {
    match (current, proposed) {
        (
            FieldKind::Reference {
                sub_fields: current_subs,
            },
            FieldKind::Reference {
                sub_fields: proposed_subs,
            },
        ) => FieldKind::Reference {
            sub_fields: merge_sub_fields(current_subs, proposed_subs, locks, report),
        },
        (current, proposed) => {
            let diff = current.structural_diff(&proposed);
            if diff.is_empty() {
                return proposed;
            }
            let locked = locks.is_locked(definition_id)
                || current.sub_fields().iter().any(|s| locks.is_locked(&s.id));
            if locked {
                report.ignore(definition_id, diff);
                current.clone()
            } else {
                proposed
            }
        }
    }
}

/// Merge a proposed sub-field list into the current one.
///
/// Locked sub-fields missing from the proposal are kept (removal rejected).
pub(crate) fn merge_sub_fields(
    current: &[SubFieldDefinition],
    proposed: Vec<SubFieldDefinition>,
    locks: &dyn FieldLocks,
    report: &mut FieldUpdateReport,
) -> Vec<SubFieldDefinition> {
    let mut merged: Vec<SubFieldDefinition> = Vec::with_capacity(proposed.len());

    for candidate in proposed {
        match current.iter().find(|c| c.id == candidate.id) {
            Some(existing) => {
                let field_type = merge_sub_field_type(
                    &existing.id,
                    &existing.field_type,
                    candidate.field_type,
                    locks,
                    report,
                );
                merged.push(SubFieldDefinition {
                    id: candidate.id,
                    name: candidate.name,
                    required: candidate.required,
                    field_type,
                });
            }
            None => merged.push(candidate),
        }
    }

    for existing in current {
        if merged.iter().any(|m| m.id == existing.id) {
            continue;
        }
        if locks.is_locked(&existing.id) {
            report.ignore(&existing.id, [LockedAttribute::Removal]);
            merged.push(existing.clone());
        }
    }

    merged
}

/// Merge a proposed sub-field type.
pub(crate) fn merge_sub_field_type(
    sub_field_id: &str,
    current: &SubFieldType,
    proposed: SubFieldType,
    locks: &dyn FieldLocks,
    report: &mut FieldUpdateReport,
) -> SubFieldType {
    let diff = current.structural_diff(&proposed);
    if diff.is_empty() || !locks.is_locked(sub_field_id) {
        proposed
    } else {
        report.ignore(sub_field_id, diff);
        current.clone()
    }
}

/// Merge a proposed catalog column type.
pub(crate) fn merge_catalog_field_type(
    field_id: &str,
    current: &CatalogFieldType,
    proposed: CatalogFieldType,
    locks: &dyn FieldLocks,
    report: &mut FieldUpdateReport,
) -> CatalogFieldType {
    let diff = current.structural_diff(&proposed);
    if diff.is_empty() || !locks.is_locked(field_id) {
        proposed
    } else {
        report.ignore(field_id, diff);
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ReferenceTarget, ScalarKind};

    fn locked(ids: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |id: &str| ids.iter().any(|candidate| *candidate == id)
    }

    fn subs() -> Vec<SubFieldDefinition> {
        vec![
            SubFieldDefinition::scalar("name", "Name", ScalarKind::Text),
            SubFieldDefinition::reference("company", "Company", ReferenceTarget::new("companies")),
        ]
    }

    #[test]
    fn test_unlocked_kind_change_applies() {
        let mut report = FieldUpdateReport::default();
        let merged = merge_field_kind(
            "f",
            &FieldKind::Scalar(ScalarKind::Text),
            FieldKind::Scalar(ScalarKind::Number),
            &NoLocks,
            &mut report,
        );
        assert_eq!(merged, FieldKind::Scalar(ScalarKind::Number));
        assert!(report.is_clean());
    }

    #[test]
    fn test_locked_kind_change_is_ignored() {
        let mut report = FieldUpdateReport::default();
        let current = FieldKind::CatalogLink {
            catalog_id: "a".into(),
            multiple: false,
        };
        let merged = merge_field_kind(
            "f",
            &current,
            FieldKind::CatalogLink {
                catalog_id: "b".into(),
                multiple: true,
            },
            &locked(&["f"]),
            &mut report,
        );
        assert_eq!(merged, current);
        assert_eq!(
            report.ignored_for("f"),
            vec![LockedAttribute::Target, LockedAttribute::Multiplicity]
        );
    }

    #[test]
    fn test_reference_to_scalar_blocked_by_used_sub_field() {
        let mut report = FieldUpdateReport::default();
        let current = FieldKind::Reference { sub_fields: subs() };
        let merged = merge_field_kind(
            "contacts",
            &current,
            FieldKind::Scalar(ScalarKind::Text),
            &locked(&["name"]),
            &mut report,
        );
        assert_eq!(merged, current);
        assert_eq!(report.ignored_for("contacts"), vec![LockedAttribute::Type]);
    }

    #[test]
    fn test_sub_field_merge_keeps_locked_structure() {
        let mut report = FieldUpdateReport::default();
        let mut proposed = subs();
        proposed[1].name = "Employer".into();
        proposed[1].required = true;
        proposed[1].field_type = SubFieldType::Reference(ReferenceTarget::new("people"));

        let merged = merge_sub_fields(&subs(), proposed, &locked(&["company"]), &mut report);

        assert_eq!(merged[1].name, "Employer");
        assert!(merged[1].required);
        assert_eq!(
            merged[1].field_type.reference_target().unwrap().definition_id,
            "companies"
        );
        assert_eq!(report.ignored_for("company"), vec![LockedAttribute::Target]);
    }

    #[test]
    fn test_locked_sub_field_cannot_be_dropped() {
        let mut report = FieldUpdateReport::default();
        let proposed = vec![SubFieldDefinition::scalar("email", "Email", ScalarKind::Email)];

        let merged = merge_sub_fields(&subs(), proposed, &locked(&["company"]), &mut report);

        let ids: Vec<_> = merged.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["email", "company"]);
        assert_eq!(report.ignored_for("company"), vec![LockedAttribute::Removal]);
        assert!(report.ignored_for("name").is_empty());
    }

    #[test]
    fn test_catalog_column_merge() {
        let mut report = FieldUpdateReport::default();
        let current = CatalogFieldType::Select {
            options: vec!["a".into()],
        };
        let merged = merge_catalog_field_type(
            "col",
            &current,
            CatalogFieldType::Select {
                options: vec!["b".into()],
            },
            &locked(&["col"]),
            &mut report,
        );
        assert_eq!(merged, current);
        assert_eq!(report.ignored_for("col"), vec![LockedAttribute::Options]);
    }
}
