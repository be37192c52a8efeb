//! FILENAME: core/pivot-engine/src/navigation.rs
//! Navigation state - the active dimensions, filter and flags of a pivot,
//! and their flat history-token form.
//!
//! History token layout (all keys optional):
//! - `row`, `column`: comma-joined column names of the active dimensions
//! - `row_fixed_values`, `column_fixed_values`: JSON array holding one label
//!   list per machine-label field on that axis, in axis order
//! - `show_incomplete`, `show_only_latest`: `"true"` or anything else
//! - `condition`: the base condition text
//! - `version`: token layout version, currently 1

use std::collections::BTreeMap;

use results_model::STATUS_FIELD;

use crate::condition::Condition;
use crate::drilldown::DrilldownTarget;
use crate::error::PivotError;
use crate::grouper::AggregationMode;
use crate::header_field::{FieldRegistry, HeaderField};
use crate::test_set::TestSet;
use crate::{log_debug, log_warn};

/// Flat string map stored in a navigable history entry.
pub type HistoryArgs = BTreeMap<String, String>;

pub const HISTORY_ROW: &str = "row";
pub const HISTORY_COLUMN: &str = "column";
pub const HISTORY_FIXED_VALUES_SUFFIX: &str = "_fixed_values";
pub const HISTORY_SHOW_INCOMPLETE: &str = "show_incomplete";
pub const HISTORY_ONLY_LATEST: &str = "show_only_latest";
pub const HISTORY_CONDITION: &str = "condition";
pub const HISTORY_VERSION: &str = "version";

/// Current history token layout version.
pub const HISTORY_FORMAT_VERSION: u32 = 1;

/// Separator between column names in the `row`/`column` keys.
const FIELD_SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState {
    pub rows: Vec<HeaderField>,
    pub columns: Vec<HeaderField>,
    /// Base filter text; narrowed by every drill-down.
    pub condition: String,
    pub show_incomplete: bool,
    pub show_only_latest: bool,
}

impl NavigationState {
    /// Default row and column dimension, no filter, both flags off.
    pub fn default_for(registry: &FieldRegistry) -> Result<Self, PivotError> {
        Ok(NavigationState {
            rows: registry.default_rows()?,
            columns: registry.default_columns()?,
            condition: String::new(),
            show_incomplete: false,
            show_only_latest: false,
        })
    }

    pub fn base_condition(&self) -> Condition {
        Condition::raw(&self.condition)
    }

    /// Condition sent to the data source: the base condition minus the
    /// always-excluded statuses and, unless incomplete tests are shown, the
    /// incomplete ones.
    pub fn query_condition(&self, excluded: &[String], incomplete: &[String]) -> Condition {
        let hidden_incomplete: &[String] = if self.show_incomplete { &[] } else { incomplete };
        let status_filters = excluded
            .iter()
            .chain(hidden_incomplete)
            .map(|status| Condition::not_equals(STATUS_FIELD, status));
        Condition::and(std::iter::once(self.base_condition()).chain(status_filters))
    }

    pub fn aggregation_mode(&self) -> AggregationMode {
        AggregationMode::for_latest_only(self.show_only_latest)
    }

    /// ANDs `extra` onto the base condition.
    pub fn refine_condition(&mut self, extra: Condition) {
        self.condition = Condition::refine(&self.condition, extra).to_string();
    }

    pub fn swap_axes(&mut self) {
        std::mem::swap(&mut self.rows, &mut self.columns);
    }

    /// An instance of `column`, reusing an active field so label lists carry over.
    fn field_for(&self, column: &str, registry: &FieldRegistry) -> Result<HeaderField, PivotError> {
        match self
            .rows
            .iter()
            .chain(&self.columns)
            .find(|field| field.column_name() == column)
        {
            Some(field) => Ok(field.clone()),
            None => registry.create(column),
        }
    }

    /// Narrows the base condition to `tests` and pivots on `target`.
    ///
    /// Only the clauses the cells contribute are ANDed on, so the new
    /// condition always contains the old one as a conjunct and never picks up
    /// the status filters the query adds.
    pub fn apply_drilldown(
        &mut self,
        tests: &TestSet,
        target: &DrilldownTarget,
        registry: &FieldRegistry,
    ) -> Result<(), PivotError> {
        let row = self.field_for(&target.row, registry)?;
        let column = self.field_for(&target.column, registry)?;
        self.refine_condition(tests.partial_condition());
        self.rows = vec![row];
        self.columns = vec![column];
        Ok(())
    }

    /// The state a drill-down would produce, leaving `self` untouched.
    pub fn drilled(
        &self,
        tests: &TestSet,
        target: &DrilldownTarget,
        registry: &FieldRegistry,
    ) -> Result<NavigationState, PivotError> {
        let mut next = self.clone();
        next.apply_drilldown(tests, target, registry)?;
        Ok(next)
    }

    // ========================================================================
    // HISTORY TOKEN
    // ========================================================================

    pub fn to_history_args(&self) -> HistoryArgs {
        let mut args = HistoryArgs::new();
        add_axis_args(&mut args, HISTORY_ROW, &self.rows);
        add_axis_args(&mut args, HISTORY_COLUMN, &self.columns);
        args.insert(HISTORY_SHOW_INCOMPLETE.to_string(), self.show_incomplete.to_string());
        args.insert(HISTORY_ONLY_LATEST.to_string(), self.show_only_latest.to_string());
        args.insert(HISTORY_CONDITION.to_string(), self.condition.clone());
        args.insert(HISTORY_VERSION.to_string(), HISTORY_FORMAT_VERSION.to_string());
        args
    }

    /// Rebuilds a state from history arguments. Missing keys fall back to the
    /// registry's default dimensions, an empty condition and false flags.
    pub fn from_history_args(args: &HistoryArgs, registry: &FieldRegistry) -> Result<Self, PivotError> {
        let version = match args.get(HISTORY_VERSION) {
            Some(value) => value.trim().parse::<u32>().map_err(|_| invalid(HISTORY_VERSION, value))?,
            None => HISTORY_FORMAT_VERSION,
        };
        if version > HISTORY_FORMAT_VERSION {
            log_warn!(
                "HISTORY",
                "token version {} is newer than {}; reading known keys only",
                version,
                HISTORY_FORMAT_VERSION
            );
        }

        let rows = read_axis_args(args, HISTORY_ROW, registry.default_row(), registry)?;
        let columns = read_axis_args(args, HISTORY_COLUMN, registry.default_column(), registry)?;
        let state = NavigationState {
            rows,
            columns,
            condition: args.get(HISTORY_CONDITION).cloned().unwrap_or_default(),
            show_incomplete: read_flag(args, HISTORY_SHOW_INCOMPLETE),
            show_only_latest: read_flag(args, HISTORY_ONLY_LATEST),
        };
        log_debug!(
            "HISTORY",
            "restored rows=[{}] columns=[{}] condition='{}'",
            join_columns(&state.rows),
            join_columns(&state.columns),
            state.condition
        );
        Ok(state)
    }
}

fn invalid(key: &str, value: &str) -> PivotError {
    PivotError::InvalidHistoryArgument {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn read_flag(args: &HistoryArgs, key: &str) -> bool {
    args.get(key).map_or(false, |value| value == "true")
}

fn join_columns(fields: &[HeaderField]) -> String {
    fields
        .iter()
        .map(HeaderField::column_name)
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

fn add_axis_args(args: &mut HistoryArgs, prefix: &str, fields: &[HeaderField]) {
    let fixed_values: Vec<&[String]> = fields.iter().filter_map(HeaderField::label_list).collect();
    args.insert(prefix.to_string(), join_columns(fields));
    // A list of string lists always serializes.
    let encoded = serde_json::to_string(&fixed_values).unwrap_or_else(|_| "[]".to_string());
    args.insert(format!("{}{}", prefix, HISTORY_FIXED_VALUES_SUFFIX), encoded);
}

fn read_axis_args(
    args: &HistoryArgs,
    prefix: &str,
    default_column: &str,
    registry: &FieldRegistry,
) -> Result<Vec<HeaderField>, PivotError> {
    let names = args.get(prefix).map(String::as_str).unwrap_or(default_column);
    let mut fields = Vec::new();
    for column in names.split(FIELD_SEPARATOR).filter(|c| !c.is_empty()) {
        let field = registry.create(column).map_err(|_| invalid(prefix, names))?;
        fields.push(field);
    }

    let fixed_key = format!("{}{}", prefix, HISTORY_FIXED_VALUES_SUFFIX);
    let fixed_values: Vec<Vec<String>> = match args.get(&fixed_key).map(|v| v.trim()) {
        None | Some("") => Vec::new(),
        Some(encoded) => serde_json::from_str(encoded).map_err(|_| invalid(&fixed_key, encoded))?,
    };
    let mut fixed_values = fixed_values.into_iter();
    for field in fields.iter_mut() {
        if let Some(labels) = field.label_list_mut() {
            *labels = fixed_values.next().unwrap_or_default();
        }
    }
    Ok(fields)
}
