//! FILENAME: core/pivot-engine/src/grid.rs
//! Pivot Grid - the renderable output of one fold.
//!
//! A Grid is built in one piece by `CellGrouper::fold` and replaced wholesale
//! on every query. It is never mutated after publication, so renderers and
//! the selection manager always see a fully-built grid.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use results_model::TestIndex;

use crate::grouper::AggregationMode;

// ============================================================================
// HEADER
// ============================================================================

/// Composite axis key: one raw value per active dimension, in dimension order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Header(SmallVec<[String; 2]>);

impl Header {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Header(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" / "))
    }
}

// ============================================================================
// CELL INFO
// ============================================================================

/// One cell of the pivot.
///
/// - `row == None`: a column-header cell (totals for that column)
/// - `column == None`: a row-header cell (totals for that row)
/// - both set: a data cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInfo {
    pub row: Option<Header>,
    pub column: Option<Header>,
    /// Number of tests folded into this cell.
    pub test_count: usize,
    /// Number of those tests that passed (status GOOD).
    pub pass_count: usize,
    /// Representative test: the first seen, or the most recent in
    /// most-recent mode. When `test_count == 1` this is the cell's only test.
    pub test_index: Option<TestIndex>,
}

/// Identity of a cell within a grid, independent of its counts.
pub type CellKey = (Option<Header>, Option<Header>);

impl CellInfo {
    pub fn key(&self) -> CellKey {
        (self.row.clone(), self.column.clone())
    }

    pub fn is_data_cell(&self) -> bool {
        self.row.is_some() && self.column.is_some()
    }

    pub fn is_row_header(&self) -> bool {
        self.row.is_some() && self.column.is_none()
    }

    pub fn is_column_header(&self) -> bool {
        self.row.is_none() && self.column.is_some()
    }

    pub fn is_single_test(&self) -> bool {
        self.test_count == 1 && self.test_index.is_some()
    }

    /// Text shown for the cell: "passed/total" for status counts, the test
    /// index for most-recent grids.
    pub fn summary(&self, mode: AggregationMode) -> String {
        match mode {
            AggregationMode::StatusCount => format!("{}/{}", self.pass_count, self.test_count),
            AggregationMode::MostRecent => self
                .test_index
                .map(|i| i.to_string())
                .unwrap_or_default(),
        }
    }
}

// ============================================================================
// GRID
// ============================================================================

/// The 2-D aggregation of records keyed by (row Header, column Header).
#[derive(Debug, Clone)]
pub struct Grid {
    mode: AggregationMode,
    rows: Vec<Header>,
    columns: Vec<Header>,
    row_lookup: FxHashMap<Header, usize>,
    column_lookup: FxHashMap<Header, usize>,
    cells: FxHashMap<(usize, usize), CellInfo>,
    row_headers: Vec<CellInfo>,
    column_headers: Vec<CellInfo>,
    total_tests: usize,
    last_cell: Option<(usize, usize)>,
}

/// Raw pieces assembled by the grouper.
pub(crate) struct GridParts {
    pub mode: AggregationMode,
    pub rows: Vec<Header>,
    pub columns: Vec<Header>,
    pub cells: FxHashMap<(usize, usize), CellInfo>,
    pub row_headers: Vec<CellInfo>,
    pub column_headers: Vec<CellInfo>,
    pub total_tests: usize,
    pub last_cell: Option<(usize, usize)>,
}

impl Grid {
    /// A grid with no rows, columns or tests.
    pub fn empty(mode: AggregationMode) -> Self {
        Grid::from_parts(GridParts {
            mode,
            rows: Vec::new(),
            columns: Vec::new(),
            cells: FxHashMap::default(),
            row_headers: Vec::new(),
            column_headers: Vec::new(),
            total_tests: 0,
            last_cell: None,
        })
    }

    pub(crate) fn from_parts(parts: GridParts) -> Self {
        let row_lookup = parts
            .rows
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        let column_lookup = parts
            .columns
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Grid {
            mode: parts.mode,
            rows: parts.rows,
            columns: parts.columns,
            row_lookup,
            column_lookup,
            cells: parts.cells,
            row_headers: parts.row_headers,
            column_headers: parts.column_headers,
            total_tests: parts.total_tests,
            last_cell: parts.last_cell,
        }
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Distinct row headers in axis order.
    pub fn rows(&self) -> &[Header] {
        &self.rows
    }

    /// Distinct column headers in axis order.
    pub fn columns(&self) -> &[Header] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of non-empty data cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn total_tests(&self) -> usize {
        self.total_tests
    }

    pub fn is_empty(&self) -> bool {
        self.total_tests == 0
    }

    pub fn row_index(&self, header: &Header) -> Option<usize> {
        self.row_lookup.get(header).copied()
    }

    pub fn column_index(&self, header: &Header) -> Option<usize> {
        self.column_lookup.get(header).copied()
    }

    /// Data cell at the given headers. Combinations with no records are absent.
    pub fn cell(&self, row: &Header, column: &Header) -> Option<&CellInfo> {
        let r = self.row_index(row)?;
        let c = self.column_index(column)?;
        self.cells.get(&(r, c))
    }

    pub fn cell_at(&self, row: usize, column: usize) -> Option<&CellInfo> {
        self.cells.get(&(row, column))
    }

    /// Row-header cell carrying the row's totals.
    pub fn row_header_cell(&self, row: usize) -> Option<&CellInfo> {
        self.row_headers.get(row)
    }

    /// Column-header cell carrying the column's totals.
    pub fn column_header_cell(&self, column: usize) -> Option<&CellInfo> {
        self.column_headers.get(column)
    }

    /// Data cells in row-major axis order.
    pub fn data_cells(&self) -> impl Iterator<Item = &CellInfo> + '_ {
        (0..self.rows.len()).flat_map(move |r| {
            (0..self.columns.len()).filter_map(move |c| self.cells.get(&(r, c)))
        })
    }

    /// Representative test of every data cell, in row-major order.
    pub fn all_test_indices(&self) -> Vec<TestIndex> {
        self.data_cells().filter_map(|cell| cell.test_index).collect()
    }

    /// The cell that received the last folded record.
    pub fn last_cell(&self) -> Option<&CellInfo> {
        self.last_cell.and_then(|key| self.cells.get(&key))
    }

    /// Looks up the current version of a cell by its key (data or header cell).
    pub fn find(&self, key: &CellKey) -> Option<&CellInfo> {
        match key {
            (Some(row), Some(column)) => self.cell(row, column),
            (Some(row), None) => self.row_index(row).and_then(|r| self.row_header_cell(r)),
            (None, Some(column)) => self
                .column_index(column)
                .and_then(|c| self.column_header_cell(c)),
            (None, None) => None,
        }
    }
}
