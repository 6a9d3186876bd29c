//! Custom field definitions.

use super::types::{LockedAttribute, ScalarKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-authored custom field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Globally unique id. Immutable once values exist for it.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the field holds.
    pub kind: FieldKind,
    /// Presentation flags.
    #[serde(default)]
    pub display: DisplayFlags,
    /// Inactive definitions are hidden from `list_active` but still resolve.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Presentation flags. Always editable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFlags {
    /// Shown on summary cards.
    #[serde(default)]
    pub show_in_summary: bool,
    /// Users may add new option values while editing a record.
    #[serde(default)]
    pub extensible_values: bool,
    /// Values are rendered as colored tags.
    #[serde(default)]
    pub color_tagged: bool,
}

/// The kind of a field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A plain value.
    Scalar(ScalarKind),
    /// One of a fixed option list.
    Select {
        /// Allowed options.
        options: Vec<String>,
    },
    /// Any subset of a fixed option list.
    Multiselect {
        /// Allowed options.
        options: Vec<String>,
    },
    /// A reference catalog: entries of this definition follow the nested schema.
    Reference {
        /// Nested mini-schema, in display order.
        sub_fields: Vec<SubFieldDefinition>,
    },
    /// A link to entries of a catalog schema.
    CatalogLink {
        /// Target catalog.
        catalog_id: String,
        /// Whether several entries may be selected.
        multiple: bool,
    },
}

impl FieldKind {
    /// Check if this is a reference catalog definition.
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldKind::Reference { .. })
    }

    /// Nested sub-fields; empty unless this is a reference definition.
    pub fn sub_fields(&self) -> &[SubFieldDefinition] {
        match self {
            FieldKind::Reference { sub_fields } => sub_fields,
            _ => &[],
        }
    }

    /// Target catalog and multiplicity of a catalog link.
    pub fn catalog_target(&self) -> Option<(&str, bool)> {
        match self {
            FieldKind::CatalogLink {
                catalog_id,
                multiple,
            } => Some((catalog_id, *multiple)),
            _ => None,
        }
    }

    /// Structural attributes that differ between `self` and `proposed`.
    ///
    /// Nested sub-fields are not compared here; each sub-field is locked
    /// independently.
    pub fn structural_diff(&self, proposed: &FieldKind) -> Vec<LockedAttribute> {
        match (self, proposed) {
            (FieldKind::Scalar(a), FieldKind::Scalar(b)) => type_if(a != b),
            (FieldKind::Select { options: a }, FieldKind::Select { options: b })
            | (FieldKind::Multiselect { options: a }, FieldKind::Multiselect { options: b }) => {
                options_if(a != b)
            }
            (FieldKind::Reference { .. }, FieldKind::Reference { .. }) => Vec::new(),
            (
                FieldKind::CatalogLink {
                    catalog_id: a,
                    multiple: ma,
                },
                FieldKind::CatalogLink {
                    catalog_id: b,
                    multiple: mb,
                },
            ) => {
                let mut diff = Vec::new();
                if a != b {
                    diff.push(LockedAttribute::Target);
                }
                if ma != mb {
                    diff.push(LockedAttribute::Multiplicity);
                }
                diff
            }
            _ => vec![LockedAttribute::Type],
        }
    }
}

/// A field in a reference definition's nested schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubFieldDefinition {
    /// Globally unique id; entry field maps are keyed by it.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Value type.
    pub field_type: SubFieldType,
    /// Whether entries must hold a non-empty value.
    #[serde(default)]
    pub required: bool,
}

/// Value type of a sub-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubFieldType {
    /// A plain value.
    Scalar(ScalarKind),
    /// One of a fixed option list.
    Select {
        /// Allowed options.
        options: Vec<String>,
    },
    /// Several values, either from an option list or from another definition's entries.
    Multiselect {
        /// Allowed options (unused when `target` is set).
        #[serde(default)]
        options: Vec<String>,
        /// Entries of another reference definition.
        #[serde(default)]
        target: Option<ReferenceTarget>,
    },
    /// A single entry of another reference definition.
    Reference(ReferenceTarget),
}

impl SubFieldType {
    /// The reference target, if values of this sub-field are entry ids.
    pub fn reference_target(&self) -> Option<&ReferenceTarget> {
        match self {
            SubFieldType::Reference(target) => Some(target),
            SubFieldType::Multiselect { target, .. } => target.as_ref(),
            SubFieldType::Scalar(_) | SubFieldType::Select { .. } => None,
        }
    }

    /// Whether the sub-field holds several values.
    pub fn is_multiple(&self) -> bool {
        matches!(self, SubFieldType::Multiselect { .. })
    }

    /// Structural attributes that differ between `self` and `proposed`.
    ///
    /// Cascade rules are not structural: they only narrow candidate lists.
    pub fn structural_diff(&self, proposed: &SubFieldType) -> Vec<LockedAttribute> {
        match (self, proposed) {
            (SubFieldType::Scalar(a), SubFieldType::Scalar(b)) => type_if(a != b),
            (SubFieldType::Select { options: a }, SubFieldType::Select { options: b }) => {
                options_if(a != b)
            }
            (
                SubFieldType::Multiselect {
                    options: oa,
                    target: ta,
                },
                SubFieldType::Multiselect {
                    options: ob,
                    target: tb,
                },
            ) => {
                let mut diff = options_if(oa != ob);
                let a = ta.as_ref().map(|t| t.definition_id.as_str());
                let b = tb.as_ref().map(|t| t.definition_id.as_str());
                if a != b {
                    diff.push(LockedAttribute::Target);
                }
                diff
            }
            (SubFieldType::Reference(a), SubFieldType::Reference(b)) => {
                if a.definition_id != b.definition_id {
                    vec![LockedAttribute::Target]
                } else {
                    Vec::new()
                }
            }
            (SubFieldType::Reference(_), SubFieldType::Multiselect { target: Some(_), .. })
            | (SubFieldType::Multiselect { target: Some(_), .. }, SubFieldType::Reference(_)) => {
                vec![LockedAttribute::Multiplicity]
            }
            _ => vec![LockedAttribute::Type],
        }
    }
}

/// Where a reference-typed sub-field points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTarget {
    /// The reference definition whose entries are selectable.
    pub definition_id: String,
    /// Narrow candidates by a sibling field's selection.
    #[serde(default)]
    pub cascade: Option<CascadeRule>,
}

impl ReferenceTarget {
    /// Create an unfiltered target.
    pub fn new(definition_id: impl Into<String>) -> Self {
        Self {
            definition_id: definition_id.into(),
            cascade: None,
        }
    }

    /// Add a cascade rule.
    pub fn with_cascade(mut self, rule: CascadeRule) -> Self {
        self.cascade = Some(rule);
        self
    }

    /// Whether candidates are narrowed by a sibling selection.
    pub fn cascade_filter(&self) -> bool {
        self.cascade.is_some()
    }
}

/// Dependent-dropdown rule: candidates are target entries whose
/// `target_field_id` equals the current value of sibling `source_field_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeRule {
    /// Sibling sub-field whose selection constrains this one.
    pub source_field_id: String,
    /// Field on the target entries compared against that selection.
    pub target_field_id: String,
}

impl CascadeRule {
    /// Create a cascade rule.
    pub fn new(source_field_id: impl Into<String>, target_field_id: impl Into<String>) -> Self {
        Self {
            source_field_id: source_field_id.into(),
            target_field_id: target_field_id.into(),
        }
    }
}

fn type_if(changed: bool) -> Vec<LockedAttribute> {
    if changed {
        vec![LockedAttribute::Type]
    } else {
        Vec::new()
    }
}

fn options_if(changed: bool) -> Vec<LockedAttribute> {
    if changed {
        vec![LockedAttribute::Options]
    } else {
        Vec::new()
    }
}

impl FieldDefinition {
    /// Create an active definition with default display flags.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            display: DisplayFlags::default(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an empty reference catalog definition.
    pub fn reference(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldKind::Reference { sub_fields: Vec::new() })
    }

    /// Create a catalog link definition.
    pub fn catalog_link(
        id: impl Into<String>,
        name: impl Into<String>,
        catalog_id: impl Into<String>,
        multiple: bool,
    ) -> Self {
        Self::new(
            id,
            name,
            FieldKind::CatalogLink {
                catalog_id: catalog_id.into(),
                multiple,
            },
        )
    }

    /// Append a sub-field (no effect unless this is a reference definition).
    pub fn with_sub_field(mut self, sub_field: SubFieldDefinition) -> Self {
        if let FieldKind::Reference { sub_fields } = &mut self.kind {
            sub_fields.push(sub_field);
        }
        self
    }

    /// Set display flags.
    pub fn with_display(mut self, display: DisplayFlags) -> Self {
        self.display = display;
        self
    }

    /// Nested sub-fields; empty unless this is a reference definition.
    pub fn sub_fields(&self) -> &[SubFieldDefinition] {
        self.kind.sub_fields()
    }

    /// Look up a sub-field by id.
    pub fn sub_field(&self, sub_field_id: &str) -> Option<&SubFieldDefinition> {
        self.sub_fields().iter().find(|s| s.id == sub_field_id)
    }

    /// Sub-fields whose values are entry ids.
    pub fn link_sub_fields(&self) -> impl Iterator<Item = (&SubFieldDefinition, &ReferenceTarget)> {
        self.sub_fields()
            .iter()
            .filter_map(|s| s.field_type.reference_target().map(|t| (s, t)))
    }
}

impl SubFieldDefinition {
    /// Create an optional sub-field.
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: SubFieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            required: false,
        }
    }

    /// Create an optional scalar sub-field.
    pub fn scalar(id: impl Into<String>, name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(id, name, SubFieldType::Scalar(kind))
    }

    /// Create a single-entry reference sub-field.
    pub fn reference(
        id: impl Into<String>,
        name: impl Into<String>,
        target: ReferenceTarget,
    ) -> Self {
        Self::new(id, name, SubFieldType::Reference(target))
    }

    /// Create a multi-entry reference sub-field.
    pub fn multi_reference(
        id: impl Into<String>,
        name: impl Into<String>,
        target: ReferenceTarget,
    ) -> Self {
        Self::new(
            id,
            name,
            SubFieldType::Multiselect {
                options: Vec::new(),
                target: Some(target),
            },
        )
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Changes to a field definition. `None` leaves the attribute alone.
#[derive(Debug, Clone, Default)]
pub struct FieldDefinitionPatch {
    /// New name.
    pub name: Option<String>,
    /// New display flags.
    pub display: Option<DisplayFlags>,
    /// New kind. Structural parts are dropped while the field is locked.
    pub kind: Option<FieldKind>,
}

impl FieldDefinitionPatch {
    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the display flags.
    pub fn display(mut self, display: DisplayFlags) -> Self {
        self.display = Some(display);
        self
    }

    /// Set the kind.
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Changes to a sub-field. `None` leaves the attribute alone.
#[derive(Debug, Clone, Default)]
pub struct SubFieldPatch {
    /// New name.
    pub name: Option<String>,
    /// New required flag.
    pub required: Option<bool>,
    /// New type. Dropped while the sub-field is locked and the change is structural.
    pub field_type: Option<SubFieldType>,
}

impl SubFieldPatch {
    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the required flag.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Set the type.
    pub fn field_type(mut self, field_type: SubFieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }
}
