//! FILENAME: core/pivot-engine/src/drilldown.rs
//! Drill-down policy - picks the next pivot dimensions for a clicked cell.
//!
//! The policy maps a dimension's column to an ordered list of suggested
//! next dimensions. Only the last (most specific) active dimension of each
//! axis is consulted. An axis the click does not touch keeps its current
//! last dimension.

use std::fmt;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::grid::CellInfo;
use crate::header_field::{HeaderField, DEFAULT_COLUMN};

/// Built-in suggestions, keyed by column name.
static DEFAULT_DRILLDOWNS: Lazy<FxHashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut table: FxHashMap<&'static str, &'static [&'static str]> = FxHashMap::default();
    table.insert("platform", &["hostname", "test_name"]);
    table.insert("hostname", &["job_tag", "status"]);
    table.insert("job_tag", &["job_tag"]);

    table.insert("kernel", &["test_name", "status"]);
    table.insert("test_name", &["job_name", "job_tag"]);

    table.insert("status", &["reason", "job_tag"]);
    table.insert("reason", &["job_tag"]);

    table.insert("job_owner", &["job_name", "job_tag"]);
    table.insert("job_name", &["job_tag"]);

    table.insert("test_finished_time", &["status", "job_tag"]);
    table.insert("DATE(test_finished_time)", &["test_finished_time", "job_tag"]);
    table
});

/// Which axes a click drills into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrilldownType {
    /// Row header: only the row axis changes.
    Row,
    /// Column header: only the column axis changes.
    Column,
    /// Data cell or multi-cell selection: both axes change.
    Both,
}

impl DrilldownType {
    pub fn from_cell(cell: &CellInfo) -> Self {
        if cell.row.is_none() {
            DrilldownType::Column
        } else if cell.column.is_none() {
            DrilldownType::Row
        } else {
            DrilldownType::Both
        }
    }
}

/// Extra or overriding suggestion entry, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrilldownRule {
    pub column: String,
    pub next: Vec<String>,
}

/// A (row, column) pair of single dimensions to pivot on next.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrilldownTarget {
    pub row: String,
    pub column: String,
}

impl DrilldownTarget {
    pub fn new(row: impl Into<String>, column: impl Into<String>) -> Self {
        DrilldownTarget {
            row: row.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for DrilldownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs. {}", self.row, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrilldownPolicy {
    table: FxHashMap<String, Vec<String>>,
}

impl DrilldownPolicy {
    /// The built-in suggestion table.
    pub fn standard() -> Self {
        let table = DEFAULT_DRILLDOWNS
            .iter()
            .map(|(column, next)| {
                (column.to_string(), next.iter().map(|s| s.to_string()).collect())
            })
            .collect();
        DrilldownPolicy { table }
    }

    /// The built-in table with `rules` added on top. A rule for a column
    /// already present replaces its suggestions; empty rules are ignored.
    pub fn with_rules(rules: &[DrilldownRule]) -> Self {
        let mut policy = Self::standard();
        for rule in rules.iter().filter(|r| !r.next.is_empty()) {
            policy.table.insert(rule.column.clone(), rule.next.clone());
        }
        policy
    }

    /// Suggested next dimensions for `column`, if the table has an entry.
    pub fn suggestions(&self, column: &str) -> Option<&[String]> {
        self.table.get(column).map(Vec::as_slice)
    }

    /// Candidates for one axis. `untouched_by` is the drill type that leaves
    /// this axis alone.
    fn axis_candidates(
        &self,
        fields: &[HeaderField],
        drill: DrilldownType,
        untouched_by: DrilldownType,
    ) -> Vec<String> {
        let Some(last) = fields.last() else {
            return Vec::new();
        };
        let current = last.column_name().to_string();
        if drill == untouched_by {
            return vec![current];
        }

        // Label fields fan out without bound, so they borrow platform's entry.
        let lookup = if last.is_machine_label() {
            DEFAULT_COLUMN
        } else {
            current.as_str()
        };
        match self.suggestions(lookup) {
            Some(next) => next.to_vec(),
            None => vec![current],
        }
    }

    pub fn row_candidates(&self, rows: &[HeaderField], drill: DrilldownType) -> Vec<String> {
        self.axis_candidates(rows, drill, DrilldownType::Column)
    }

    pub fn column_candidates(&self, columns: &[HeaderField], drill: DrilldownType) -> Vec<String> {
        self.axis_candidates(columns, drill, DrilldownType::Row)
    }

    /// The pair used for a plain click: the first candidate on each axis.
    pub fn default_target(
        &self,
        rows: &[HeaderField],
        columns: &[HeaderField],
        drill: DrilldownType,
    ) -> Option<DrilldownTarget> {
        let row = self.row_candidates(rows, drill).into_iter().next()?;
        let column = self.column_candidates(columns, drill).into_iter().next()?;
        Some(DrilldownTarget { row, column })
    }

    /// Every (row, column) candidate pair, skipping pairs that would put the
    /// same dimension on both axes.
    pub fn menu_options(
        &self,
        rows: &[HeaderField],
        columns: &[HeaderField],
        drill: DrilldownType,
    ) -> Vec<DrilldownTarget> {
        let column_candidates = self.column_candidates(columns, drill);
        let mut options = Vec::new();
        for row in self.row_candidates(rows, drill) {
            for column in &column_candidates {
                if &row == column {
                    continue;
                }
                options.push(DrilldownTarget::new(row.clone(), column.clone()));
            }
        }
        options
    }
}

impl Default for DrilldownPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Header;

    fn fields(columns: &[&str]) -> Vec<HeaderField> {
        columns.iter().map(|c| HeaderField::simple(*c, *c)).collect()
    }

    #[test]
    fn drill_type_follows_cell_kind() {
        let data = CellInfo {
            row: Some(Header::new(["x64"])),
            column: Some(Header::new(["GOOD"])),
            test_count: 2,
            pass_count: 2,
            test_index: Some(1),
        };
        assert_eq!(DrilldownType::from_cell(&data), DrilldownType::Both);
        assert_eq!(
            DrilldownType::from_cell(&CellInfo { row: None, ..data.clone() }),
            DrilldownType::Column
        );
        assert_eq!(
            DrilldownType::from_cell(&CellInfo { column: None, ..data }),
            DrilldownType::Row
        );
    }

    #[test]
    fn data_cell_uses_last_dimension_of_each_axis() {
        let policy = DrilldownPolicy::standard();
        let rows = fields(&["job_owner", "kernel"]);
        let columns = fields(&["platform"]);
        assert_eq!(
            policy.default_target(&rows, &columns, DrilldownType::Both),
            Some(DrilldownTarget::new("test_name", "hostname"))
        );
    }

    #[test]
    fn header_click_keeps_the_other_axis() {
        let policy = DrilldownPolicy::standard();
        let rows = fields(&["kernel"]);
        let columns = fields(&["platform"]);

        assert_eq!(
            policy.default_target(&rows, &columns, DrilldownType::Column),
            Some(DrilldownTarget::new("kernel", "hostname"))
        );
        assert_eq!(
            policy.default_target(&rows, &columns, DrilldownType::Row),
            Some(DrilldownTarget::new("test_name", "platform"))
        );
    }

    #[test]
    fn machine_labels_drill_like_platform() {
        let policy = DrilldownPolicy::standard();
        let rows = fields(&["kernel"]);
        let columns = vec![HeaderField::machine_label("Labels", vec!["bvt".to_string()])];
        assert_eq!(
            policy.column_candidates(&columns, DrilldownType::Both),
            vec!["hostname".to_string(), "test_name".to_string()]
        );
        assert_eq!(
            policy.default_target(&rows, &columns, DrilldownType::Both),
            Some(DrilldownTarget::new("test_name", "hostname"))
        );
    }

    #[test]
    fn unknown_dimension_keeps_current_field() {
        let policy = DrilldownPolicy::standard();
        let rows = fields(&["build_id"]);
        assert_eq!(policy.row_candidates(&rows, DrilldownType::Both), vec!["build_id".to_string()]);
    }

    #[test]
    fn menu_skips_identical_pairs() {
        let policy = DrilldownPolicy::standard();
        let rows = fields(&["status"]);
        let columns = fields(&["hostname"]);
        let options: Vec<String> = policy
            .menu_options(&rows, &columns, DrilldownType::Both)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            options,
            vec!["reason vs. job_tag", "reason vs. status", "job_tag vs. status"]
        );
    }

    #[test]
    fn configured_rules_override_and_extend() {
        let policy = DrilldownPolicy::with_rules(&[
            DrilldownRule {
                column: "kernel".to_string(),
                next: vec!["hostname".to_string()],
            },
            DrilldownRule {
                column: "build_id".to_string(),
                next: vec!["test_name".to_string()],
            },
        ]);
        assert_eq!(policy.suggestions("kernel"), Some(&["hostname".to_string()][..]));
        assert_eq!(policy.suggestions("build_id"), Some(&["test_name".to_string()][..]));
        assert!(policy.suggestions("platform").is_some());
    }
}
