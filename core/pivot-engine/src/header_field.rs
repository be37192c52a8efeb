//! FILENAME: core/pivot-engine/src/header_field.rs
//! Header fields - the dimensions a pivot can group by.
//!
//! A header field maps a logical grouping key to a backend column and knows
//! how to turn one of its values back into a condition fragment. The set of
//! variants is closed: plain columns, and machine-label fields whose value is
//! itself a set of labels chosen by the user.

use serde::{Deserialize, Serialize};

use results_model::{TestRecord, MACHINE_LABELS_FIELD, NULL_VALUE};

use crate::condition::Condition;
use crate::error::PivotError;

// ============================================================================
// FIELD VARIANTS
// ============================================================================

/// A field whose header value is the raw column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleHeaderField {
    /// Display name shown in field pickers.
    pub name: String,
    /// Backend column name.
    pub column: String,
}

/// A field grouping machines by which of a user-entered list of labels they
/// carry. The header value is the comma-joined subset of candidate labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineLabelField {
    pub name: String,
    pub column: String,
    /// Candidate labels, editable between queries. Must be non-empty to query.
    #[serde(default)]
    pub labels: Vec<String>,
}

/// A groupable dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderField {
    Simple(SimpleHeaderField),
    MachineLabel(MachineLabelField),
}

impl HeaderField {
    pub fn simple(name: impl Into<String>, column: impl Into<String>) -> Self {
        HeaderField::Simple(SimpleHeaderField {
            name: name.into(),
            column: column.into(),
        })
    }

    pub fn machine_label(name: impl Into<String>, labels: Vec<String>) -> Self {
        HeaderField::MachineLabel(MachineLabelField {
            name: name.into(),
            column: MACHINE_LABELS_FIELD.to_string(),
            labels,
        })
    }

    pub fn display_name(&self) -> &str {
        match self {
            HeaderField::Simple(f) => &f.name,
            HeaderField::MachineLabel(f) => &f.name,
        }
    }

    pub fn column_name(&self) -> &str {
        match self {
            HeaderField::Simple(f) => &f.column,
            HeaderField::MachineLabel(f) => &f.column,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            HeaderField::Simple(_) => FieldKind::Simple,
            HeaderField::MachineLabel(_) => FieldKind::MachineLabel,
        }
    }

    pub fn is_machine_label(&self) -> bool {
        matches!(self, HeaderField::MachineLabel(_))
    }

    /// Candidate labels of a machine-label field.
    pub fn label_list(&self) -> Option<&[String]> {
        match self {
            HeaderField::MachineLabel(f) => Some(&f.labels),
            HeaderField::Simple(_) => None,
        }
    }

    pub fn label_list_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            HeaderField::MachineLabel(f) => Some(&mut f.labels),
            HeaderField::Simple(_) => None,
        }
    }

    /// Extracts this field's header value from a record.
    /// Missing values come back as `NULL_VALUE`.
    pub fn extract_value(&self, record: &TestRecord) -> String {
        match self {
            HeaderField::Simple(f) => record.value_or_null(&f.column).to_string(),
            HeaderField::MachineLabel(f) => {
                let carried: Vec<&str> = record.machine_labels().collect();
                let matching: Vec<&str> = f
                    .labels
                    .iter()
                    .map(String::as_str)
                    .filter(|label| carried.contains(label))
                    .collect();
                if matching.is_empty() {
                    NULL_VALUE.to_string()
                } else {
                    matching.join(",")
                }
            }
        }
    }

    /// Condition selecting records whose value for this field is `value`.
    pub fn value_to_condition(&self, value: &str) -> Condition {
        match self {
            HeaderField::Simple(f) => {
                if value == NULL_VALUE {
                    Condition::is_null(&f.column)
                } else {
                    Condition::equals(&f.column, value)
                }
            }
            HeaderField::MachineLabel(f) => {
                if value == NULL_VALUE {
                    if f.labels.is_empty() {
                        return Condition::is_null(&f.column);
                    }
                    let any_label = f.labels.iter().map(|l| Condition::contains(&f.column, l));
                    Condition::negate(Condition::or(any_label))
                } else {
                    Condition::or(
                        value
                            .split(',')
                            .filter(|l| !l.is_empty())
                            .map(|l| Condition::contains(&f.column, l)),
                    )
                }
            }
        }
    }

    /// Checks the field is ready to take part in a query.
    pub fn validate(&self) -> Result<(), PivotError> {
        match self {
            HeaderField::MachineLabel(f) if f.labels.is_empty() => Err(PivotError::EmptyLabelList {
                field: f.name.clone(),
            }),
            HeaderField::MachineLabel(f) => {
                // Header values join labels with ','; a label holding one
                // could not be mapped back to a condition.
                let malformed = f
                    .labels
                    .iter()
                    .find(|l| l.is_empty() || l.contains(',') || l.trim() != l.as_str());
                match malformed {
                    Some(label) => Err(PivotError::InvalidField {
                        column: f.column.clone(),
                        reason: format!("label '{}' must be non-empty, trimmed and free of ','", label),
                    }),
                    None => Ok(()),
                }
            }
            HeaderField::Simple(_) => Ok(()),
        }
    }
}

/// Splits user-entered labels on ',', trims them and drops empties and
/// repeats, keeping first-entry order.
pub fn normalize_labels<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut labels: Vec<String> = Vec::new();
    for entry in entries {
        for label in entry.as_ref().split(',').map(str::trim).filter(|l| !l.is_empty()) {
            if !labels.iter().any(|known| known == label) {
                labels.push(label.to_string());
            }
        }
    }
    labels
}

/// Rejects a dimension configuration that cannot be queried.
pub fn validate_dimensions(rows: &[HeaderField], columns: &[HeaderField]) -> Result<(), PivotError> {
    if rows.is_empty() || columns.is_empty() {
        return Err(PivotError::EmptyDimensions);
    }
    for field in rows.iter().chain(columns) {
        field.validate()?;
    }
    Ok(())
}

// ============================================================================
// FIELD REGISTRY
// ============================================================================

/// Which variant a configured field uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Simple,
    MachineLabel,
}

/// Serializable description of one groupable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub column: String,
    #[serde(default)]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: &str, column: &str, kind: FieldKind) -> Self {
        FieldSpec {
            name: name.to_string(),
            column: column.to_string(),
            kind,
        }
    }

    fn to_field(&self) -> HeaderField {
        match self.kind {
            FieldKind::Simple => HeaderField::simple(&self.name, &self.column),
            FieldKind::MachineLabel => HeaderField::MachineLabel(MachineLabelField {
                name: self.name.clone(),
                column: self.column.clone(),
                labels: Vec::new(),
            }),
        }
    }
}

pub const DEFAULT_ROW: &str = "kernel";
pub const DEFAULT_COLUMN: &str = "platform";

/// The standard catalogue of groupable result fields.
pub fn standard_group_fields() -> Vec<FieldSpec> {
    use FieldKind::*;
    vec![
        FieldSpec::new("Kernel", "kernel", Simple),
        FieldSpec::new("Platform", "platform", Simple),
        FieldSpec::new("Hostname", "hostname", Simple),
        FieldSpec::new("Test name", "test_name", Simple),
        FieldSpec::new("Status", "status", Simple),
        FieldSpec::new("Reason", "reason", Simple),
        FieldSpec::new("Job tag", "job_tag", Simple),
        FieldSpec::new("Job owner", "job_owner", Simple),
        FieldSpec::new("Job name", "job_name", Simple),
        FieldSpec::new("Finished time", "test_finished_time", Simple),
        FieldSpec::new("Finished date", "DATE(test_finished_time)", Simple),
        FieldSpec::new("Machine labels", MACHINE_LABELS_FIELD, MachineLabel),
    ]
}

/// Catalogue of groupable fields, keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRegistry {
    fields: Vec<HeaderField>,
    default_row: String,
    default_column: String,
}

impl FieldRegistry {
    /// Registry over the standard fields with the standard defaults.
    pub fn standard() -> Self {
        let fields = standard_group_fields().iter().map(FieldSpec::to_field).collect();
        FieldRegistry {
            fields,
            default_row: DEFAULT_ROW.to_string(),
            default_column: DEFAULT_COLUMN.to_string(),
        }
    }

    pub fn from_specs(
        specs: &[FieldSpec],
        default_row: &str,
        default_column: &str,
    ) -> Result<Self, PivotError> {
        let mut fields: Vec<HeaderField> = Vec::with_capacity(specs.len());
        for spec in specs {
            if spec.column.trim().is_empty() {
                return Err(PivotError::InvalidField {
                    column: spec.column.clone(),
                    reason: "column name is empty".to_string(),
                });
            }
            if spec.column.contains(',') {
                return Err(PivotError::InvalidField {
                    column: spec.column.clone(),
                    reason: "column name must not contain ','".to_string(),
                });
            }
            if fields.iter().any(|f| f.column_name() == spec.column) {
                return Err(PivotError::InvalidField {
                    column: spec.column.clone(),
                    reason: "duplicate column".to_string(),
                });
            }
            fields.push(spec.to_field());
        }

        let registry = FieldRegistry {
            fields,
            default_row: default_row.to_string(),
            default_column: default_column.to_string(),
        };
        registry.create(default_row)?;
        registry.create(default_column)?;
        Ok(registry)
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    pub fn get(&self, column: &str) -> Option<&HeaderField> {
        self.fields.iter().find(|f| f.column_name() == column)
    }

    /// Fresh instance of a catalogued field (label lists start empty).
    pub fn create(&self, column: &str) -> Result<HeaderField, PivotError> {
        self.get(column)
            .cloned()
            .ok_or_else(|| PivotError::UnknownField(column.to_string()))
    }

    pub fn default_row(&self) -> &str {
        &self.default_row
    }

    pub fn default_column(&self) -> &str {
        &self.default_column
    }

    pub fn default_rows(&self) -> Result<Vec<HeaderField>, PivotError> {
        Ok(vec![self.create(&self.default_row)?])
    }

    pub fn default_columns(&self) -> Result<Vec<HeaderField>, PivotError> {
        Ok(vec![self.create(&self.default_column)?])
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
