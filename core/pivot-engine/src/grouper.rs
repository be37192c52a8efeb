//! FILENAME: core/pivot-engine/src/grouper.rs
//! Cell Grouper - folds flat test records into a 2-D grid.
//!
//! Algorithm (single pass, O(n) in the number of records):
//! 1. Compute each record's row Header and column Header from the active
//!    dimensions, interning each distinct Header to an axis index on first
//!    appearance.
//! 2. Accumulate the record into its data cell and into the row and column
//!    header totals.
//! 3. Optionally re-order the axes, then publish the Grid in one piece.
//!
//! The dimension lists are validated when the grouper is built, so the fold
//! itself cannot fail.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use results_model::TestRecord;

use crate::error::PivotError;
use crate::grid::{CellInfo, Grid, GridParts, Header};
use crate::header_field::{validate_dimensions, HeaderField};

// ============================================================================
// OPTIONS
// ============================================================================

/// How records collapse into a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Count tests (and passes); the representative is the first test seen.
    #[default]
    StatusCount,
    /// Count tests; the representative is the most recent test.
    MostRecent,
}

impl AggregationMode {
    pub fn for_latest_only(show_only_latest: bool) -> Self {
        if show_only_latest {
            AggregationMode::MostRecent
        } else {
            AggregationMode::StatusCount
        }
    }
}

/// Axis ordering of the published grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeaderSort {
    /// Order of first appearance in the record stream.
    #[default]
    FirstAppearance,
    /// Lexicographic by header values.
    Ascending,
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

#[derive(Debug, Default)]
struct CellAccumulator<'r> {
    test_count: usize,
    pass_count: usize,
    representative: Option<&'r TestRecord>,
}

impl<'r> CellAccumulator<'r> {
    fn add(&mut self, record: &'r TestRecord, mode: AggregationMode) {
        self.test_count += 1;
        if record.status().map_or(false, |s| s.is_pass()) {
            self.pass_count += 1;
        }
        let replace = match (self.representative, mode) {
            (None, _) => true,
            (Some(current), AggregationMode::MostRecent) => record.is_more_recent_than(current),
            (Some(_), AggregationMode::StatusCount) => false,
        };
        if replace {
            self.representative = Some(record);
        }
    }

    fn to_cell(&self, row: Option<Header>, column: Option<Header>) -> CellInfo {
        CellInfo {
            row,
            column,
            test_count: self.test_count,
            pass_count: self.pass_count,
            test_index: self.representative.map(|r| r.test_index),
        }
    }
}

/// Distinct headers of one axis plus their running totals.
#[derive(Default)]
struct AxisBuilder<'r> {
    headers: Vec<Header>,
    lookup: FxHashMap<Header, usize>,
    totals: Vec<CellAccumulator<'r>>,
}

impl<'r> AxisBuilder<'r> {
    fn intern(&mut self, header: Header) -> usize {
        if let Some(&index) = self.lookup.get(&header) {
            return index;
        }
        let index = self.headers.len();
        self.headers.push(header.clone());
        self.lookup.insert(header, index);
        self.totals.push(CellAccumulator::default());
        index
    }

    /// Old index -> new index mapping for the requested order.
    fn permutation(&self, sort: HeaderSort) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.headers.len()).collect();
        if sort == HeaderSort::Ascending {
            order.sort_by(|&a, &b| self.headers[a].cmp(&self.headers[b]));
        }
        let mut new_index = vec![0; order.len()];
        for (position, &old) in order.iter().enumerate() {
            new_index[old] = position;
        }
        new_index
    }
}

// ============================================================================
// GROUPER
// ============================================================================

/// Folds records into a grid over validated row/column dimensions.
#[derive(Debug, Clone)]
pub struct CellGrouper<'a> {
    rows: &'a [HeaderField],
    columns: &'a [HeaderField],
    mode: AggregationMode,
    sort: HeaderSort,
}

impl<'a> CellGrouper<'a> {
    /// Builds a grouper, rejecting dimension lists that cannot be queried.
    pub fn new(
        rows: &'a [HeaderField],
        columns: &'a [HeaderField],
        mode: AggregationMode,
    ) -> Result<Self, PivotError> {
        validate_dimensions(rows, columns)?;
        Ok(CellGrouper {
            rows,
            columns,
            mode,
            sort: HeaderSort::FirstAppearance,
        })
    }

    pub fn with_sort(mut self, sort: HeaderSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    fn header_for(fields: &[HeaderField], record: &TestRecord) -> Header {
        Header::new(fields.iter().map(|field| field.extract_value(record)))
    }

    /// Row header of a record under the active row dimensions.
    pub fn row_header(&self, record: &TestRecord) -> Header {
        Self::header_for(self.rows, record)
    }

    /// Column header of a record under the active column dimensions.
    pub fn column_header(&self, record: &TestRecord) -> Header {
        Self::header_for(self.columns, record)
    }

    /// Folds `records` into a new grid.
    pub fn fold<'r, I>(&self, records: I) -> Grid
    where
        I: IntoIterator<Item = &'r TestRecord>,
    {
        let mut row_axis = AxisBuilder::default();
        let mut column_axis = AxisBuilder::default();
        let mut cells: FxHashMap<(usize, usize), CellAccumulator<'r>> = FxHashMap::default();
        let mut total_tests = 0;
        let mut last_cell = None;

        for record in records {
            let r = row_axis.intern(self.row_header(record));
            let c = column_axis.intern(self.column_header(record));

            cells.entry((r, c)).or_default().add(record, self.mode);
            row_axis.totals[r].add(record, self.mode);
            column_axis.totals[c].add(record, self.mode);

            total_tests += 1;
            last_cell = Some((r, c));
        }

        let row_order = row_axis.permutation(self.sort);
        let column_order = column_axis.permutation(self.sort);

        let mut rows = row_axis.headers.clone();
        for (old, header) in row_axis.headers.iter().enumerate() {
            rows[row_order[old]] = header.clone();
        }
        let mut columns = column_axis.headers.clone();
        for (old, header) in column_axis.headers.iter().enumerate() {
            columns[column_order[old]] = header.clone();
        }

        let mut row_headers = vec![None; rows.len()];
        for (old, totals) in row_axis.totals.iter().enumerate() {
            let new = row_order[old];
            row_headers[new] = Some(totals.to_cell(Some(rows[new].clone()), None));
        }
        let mut column_headers = vec![None; columns.len()];
        for (old, totals) in column_axis.totals.iter().enumerate() {
            let new = column_order[old];
            column_headers[new] = Some(totals.to_cell(None, Some(columns[new].clone())));
        }

        let cells = cells
            .into_iter()
            .map(|((r, c), acc)| {
                let (r, c) = (row_order[r], column_order[c]);
                let cell = acc.to_cell(Some(rows[r].clone()), Some(columns[c].clone()));
                ((r, c), cell)
            })
            .collect();

        Grid::from_parts(GridParts {
            mode: self.mode,
            rows,
            columns,
            cells,
            row_headers: row_headers.into_iter().flatten().collect(),
            column_headers: column_headers.into_iter().flatten().collect(),
            total_tests,
            last_cell: last_cell.map(|(r, c)| (row_order[r], column_order[c])),
        })
    }
}

/// Validates the dimensions and folds `records` in one call.
pub fn calculate_grid(
    records: &[TestRecord],
    rows: &[HeaderField],
    columns: &[HeaderField],
    mode: AggregationMode,
    sort: HeaderSort,
) -> Result<Grid, PivotError> {
    let grouper = CellGrouper::new(rows, columns, mode)?.with_sort(sort);
    Ok(grouper.fold(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use results_model::NULL_VALUE;

    fn platform() -> Vec<HeaderField> {
        vec![HeaderField::simple("Platform", "platform")]
    }

    fn status() -> Vec<HeaderField> {
        vec![HeaderField::simple("Status", "status")]
    }

    fn record(index: i64, platform: &str, status: &str) -> TestRecord {
        TestRecord::new(index)
            .with_field("platform", platform)
            .with_field("status", status)
    }

    #[test]
    fn folds_records_into_cells() {
        let records = vec![
            record(1, "x64", "GOOD"),
            record(2, "x64", "FAIL"),
            record(3, "arm", "GOOD"),
        ];
        let rows = platform();
        let columns = status();
        let grid = CellGrouper::new(&rows, &columns, AggregationMode::StatusCount)
            .unwrap()
            .fold(&records);

        let x64 = Header::new(["x64"]);
        let arm = Header::new(["arm"]);
        let good = Header::new(["GOOD"]);
        let fail = Header::new(["FAIL"]);

        assert_eq!(grid.rows(), &[x64.clone(), arm.clone()]);
        assert_eq!(grid.columns(), &[good.clone(), fail.clone()]);
        assert_eq!(grid.cell(&x64, &good).unwrap().test_count, 1);
        assert_eq!(grid.cell(&x64, &fail).unwrap().test_count, 1);
        assert_eq!(grid.cell(&arm, &good).unwrap().test_count, 1);
        assert!(grid.cell(&arm, &fail).is_none());
        assert_eq!(grid.total_tests(), 3);
    }

    #[test]
    fn header_cells_carry_axis_totals() {
        let records = vec![
            record(1, "x64", "GOOD"),
            record(2, "x64", "FAIL"),
            record(3, "arm", "GOOD"),
        ];
        let (rows, columns) = (platform(), status());
        let grid = calculate_grid(&records, &rows, &columns, AggregationMode::StatusCount, HeaderSort::FirstAppearance)
            .unwrap();

        let x64_row = grid.row_header_cell(0).unwrap();
        assert!(x64_row.is_row_header());
        assert_eq!(x64_row.test_count, 2);
        assert_eq!(x64_row.pass_count, 1);

        let good_column = grid.column_header_cell(0).unwrap();
        assert!(good_column.is_column_header());
        assert_eq!(good_column.test_count, 2);
        assert_eq!(good_column.pass_count, 2);
    }

    #[test]
    fn missing_dimension_values_group_under_null() {
        let records = vec![
            TestRecord::new(1).with_field("status", "GOOD"),
            TestRecord::new(2).with_field("status", "FAIL"),
            record(3, "x64", "GOOD"),
        ];
        let (rows, columns) = (platform(), status());
        let grid = CellGrouper::new(&rows, &columns, AggregationMode::StatusCount)
            .unwrap()
            .fold(&records);

        let null_row = Header::new([NULL_VALUE]);
        assert_eq!(grid.row_index(&null_row), Some(0));
        assert_eq!(grid.row_header_cell(0).unwrap().test_count, 2);
        assert_eq!(grid.total_tests(), 3);
    }

    #[test]
    fn status_count_keeps_first_test_as_representative() {
        let records = vec![record(5, "x64", "GOOD"), record(9, "x64", "GOOD")];
        let (rows, columns) = (platform(), status());
        let grid = CellGrouper::new(&rows, &columns, AggregationMode::StatusCount)
            .unwrap()
            .fold(&records);
        let cell = grid.cell_at(0, 0).unwrap();
        assert_eq!(cell.test_count, 2);
        assert_eq!(cell.test_index, Some(5));
    }

    #[test]
    fn most_recent_mode_tracks_latest_test() {
        let day = |d| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .and_then(|date| date.and_hms_opt(12, 0, 0))
                .unwrap()
        };
        let records = vec![
            record(30, "x64", "GOOD").with_finished_at(day(1)),
            record(10, "x64", "GOOD").with_finished_at(day(3)),
            record(20, "x64", "GOOD").with_finished_at(day(2)),
        ];
        let (rows, columns) = (platform(), status());
        let grid = CellGrouper::new(&rows, &columns, AggregationMode::MostRecent)
            .unwrap()
            .fold(&records);
        assert_eq!(grid.cell_at(0, 0).unwrap().test_index, Some(10));
        assert_eq!(grid.all_test_indices(), vec![10]);
    }

    #[test]
    fn ascending_sort_reorders_axes_consistently() {
        let records = vec![
            record(1, "x64", "GOOD"),
            record(2, "arm", "FAIL"),
            record(3, "mips", "GOOD"),
        ];
        let (rows, columns) = (platform(), status());
        let grid = CellGrouper::new(&rows, &columns, AggregationMode::StatusCount)
            .unwrap()
            .with_sort(HeaderSort::Ascending)
            .fold(&records);

        assert_eq!(
            grid.rows(),
            &[Header::new(["arm"]), Header::new(["mips"]), Header::new(["x64"])]
        );
        assert_eq!(grid.columns(), &[Header::new(["FAIL"]), Header::new(["GOOD"])]);
        let arm_fail = grid.cell_at(0, 0).unwrap();
        assert_eq!(arm_fail.test_index, Some(2));
        assert_eq!(grid.row_header_cell(2).unwrap().row, Some(Header::new(["x64"])));
        assert_eq!(grid.last_cell().unwrap().test_index, Some(3));
    }

    #[test]
    fn multi_field_headers_keep_dimension_order() {
        let rows = vec![
            HeaderField::simple("Kernel", "kernel"),
            HeaderField::simple("Platform", "platform"),
        ];
        let columns = status();
        let records = vec![record(1, "x64", "GOOD").with_field("kernel", "2.6.18")];
        let grid = CellGrouper::new(&rows, &columns, AggregationMode::StatusCount)
            .unwrap()
            .fold(&records);
        assert_eq!(grid.rows(), &[Header::new(["2.6.18", "x64"])]);
    }

    #[test]
    fn rejects_empty_dimensions_before_folding() {
        let columns = status();
        assert!(matches!(
            CellGrouper::new(&[], &columns, AggregationMode::StatusCount),
            Err(PivotError::EmptyDimensions)
        ));
    }

    #[test]
    fn empty_record_set_gives_empty_grid() {
        let (rows, columns) = (platform(), status());
        let grid = CellGrouper::new(&rows, &columns, AggregationMode::StatusCount)
            .unwrap()
            .fold(std::iter::empty());
        assert!(grid.is_empty());
        assert_eq!(grid.row_count(), 0);
    }
}
