//! FILENAME: core/pivot-engine/src/test_set.rs
//! Test sets - "which tests does this selection refer to", as a value.
//!
//! A TestSet is built on demand from a clicked cell (or a multi-cell
//! selection) plus the filter the grid was queried with, consumed once, and
//! dropped. `condition()` is the full filter handed to table views and label
//! edits; `partial_condition()` is only what the cells add, which drill-down
//! ANDs onto the navigation condition.

use results_model::TestIndex;

use crate::condition::Condition;
use crate::grid::{CellInfo, Header};
use crate::header_field::HeaderField;

/// Exactly one known test. Opens a detail view instead of a filtered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleTestSet {
    test_index: TestIndex,
    base: Condition,
}

impl SingleTestSet {
    pub fn new(test_index: TestIndex, base: Condition) -> Self {
        SingleTestSet { test_index, base }
    }

    pub fn test_index(&self) -> TestIndex {
        self.test_index
    }

    pub fn partial_condition(&self) -> Condition {
        Condition::test_index(self.test_index)
    }

    pub fn condition(&self) -> Condition {
        Condition::and([self.base.clone(), self.partial_condition()])
    }
}

/// A base condition narrowed by a conjunction of field clauses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConditionTestSet {
    base: Condition,
    clauses: Vec<Condition>,
}

impl ConditionTestSet {
    pub fn new(base: Condition) -> Self {
        ConditionTestSet {
            base,
            clauses: Vec::new(),
        }
    }

    pub fn add_condition(&mut self, clause: Condition) {
        self.clauses.push(clause);
    }

    /// Adds `field = value` (or `field IS NULL`) for one dimension.
    pub fn set_field(&mut self, field: &HeaderField, value: &str) {
        self.add_condition(field.value_to_condition(value));
    }

    /// Adds one clause per header value, pairing values with `fields` in order.
    pub fn set_fields(&mut self, fields: &[HeaderField], values: &Header) {
        for (field, value) in fields.iter().zip(values.values()) {
            self.set_field(field, value);
        }
    }

    pub fn base(&self) -> &Condition {
        &self.base
    }

    /// The accumulated clauses without the base condition.
    pub fn partial_condition(&self) -> Condition {
        Condition::and(self.clauses.iter().cloned())
    }

    pub fn condition(&self) -> Condition {
        Condition::and(std::iter::once(self.base.clone()).chain(self.clauses.iter().cloned()))
    }
}

/// Union of other test sets sharing one base condition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositeTestSet {
    base: Condition,
    children: Vec<TestSet>,
}

impl CompositeTestSet {
    pub fn new(base: Condition) -> Self {
        CompositeTestSet {
            base,
            children: Vec::new(),
        }
    }

    pub fn add(&mut self, child: TestSet) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[TestSet] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn only_child(&self) -> Option<&TestSet> {
        match self.children.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// OR of the children's own clauses; matches nothing when empty.
    pub fn partial_condition(&self) -> Condition {
        if self.children.is_empty() {
            return Condition::TestIndexIn(Vec::new());
        }
        Condition::or(self.children.iter().map(TestSet::partial_condition))
    }

    pub fn condition(&self) -> Condition {
        if self.children.is_empty() {
            return Condition::TestIndexIn(Vec::new());
        }
        Condition::and([self.base.clone(), self.partial_condition()])
    }
}

/// A composable, serializable description of a set of tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestSet {
    Single(SingleTestSet),
    Condition(ConditionTestSet),
    Composite(CompositeTestSet),
}

impl TestSet {
    /// Test set for one clicked cell.
    ///
    /// A cell holding exactly one test becomes a single-test set; otherwise
    /// the base condition is narrowed by the cell's row and/or column values.
    pub fn from_cell(
        cell: &CellInfo,
        rows: &[HeaderField],
        columns: &[HeaderField],
        base: &Condition,
    ) -> TestSet {
        if let (1, Some(test_index)) = (cell.test_count, cell.test_index) {
            return TestSet::Single(SingleTestSet::new(test_index, base.clone()));
        }

        let mut tests = ConditionTestSet::new(base.clone());
        if let Some(row) = &cell.row {
            tests.set_fields(rows, row);
        }
        if let Some(column) = &cell.column {
            tests.set_fields(columns, column);
        }
        TestSet::Condition(tests)
    }

    /// Union of the test sets of several cells.
    pub fn from_cells<'c, I>(
        cells: I,
        rows: &[HeaderField],
        columns: &[HeaderField],
        base: &Condition,
    ) -> TestSet
    where
        I: IntoIterator<Item = &'c CellInfo>,
    {
        let mut composite = CompositeTestSet::new(base.clone());
        for cell in cells {
            composite.add(TestSet::from_cell(cell, rows, columns, base));
        }
        TestSet::Composite(composite)
    }

    pub fn is_single_test(&self) -> bool {
        match self {
            TestSet::Single(_) => true,
            TestSet::Condition(_) => false,
            TestSet::Composite(composite) => {
                composite.only_child().map_or(false, TestSet::is_single_test)
            }
        }
    }

    /// The single test's index; `None` unless `is_single_test()`.
    pub fn test_index(&self) -> Option<TestIndex> {
        match self {
            TestSet::Single(single) => Some(single.test_index()),
            TestSet::Condition(_) => None,
            TestSet::Composite(composite) => composite.only_child().and_then(TestSet::test_index),
        }
    }

    /// What the cells contribute, without the base condition.
    pub fn partial_condition(&self) -> Condition {
        match self {
            TestSet::Single(single) => single.partial_condition(),
            TestSet::Condition(tests) => tests.partial_condition(),
            TestSet::Composite(composite) => composite.partial_condition(),
        }
    }

    pub fn condition(&self) -> Condition {
        match self {
            TestSet::Single(single) => single.condition(),
            TestSet::Condition(tests) => tests.condition(),
            TestSet::Composite(composite) => composite.condition(),
        }
    }
}
