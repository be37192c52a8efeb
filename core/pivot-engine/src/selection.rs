//! FILENAME: core/pivot-engine/src/selection.rs
//! Selection Manager - multi-select over grid cells.
//!
//! Holds the selected cells in selection order, keyed by their header pair.
//! Every mutator reports whether the selection changed so the caller can ask
//! the render surface for a refresh; the manager itself draws nothing.

use crate::condition::Condition;
use crate::grid::{CellInfo, CellKey, Grid};
use crate::header_field::HeaderField;
use crate::test_set::TestSet;

#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selected: Vec<CellInfo>,
}

impl SelectionManager {
    pub fn new() -> Self {
        SelectionManager::default()
    }

    fn position(&self, key: &CellKey) -> Option<usize> {
        self.selected
            .iter()
            .position(|cell| cell.row == key.0 && cell.column == key.1)
    }

    /// Adds the cell if absent, removes it if present.
    /// Returns true when the cell is selected afterwards.
    pub fn toggle_selected(&mut self, cell: &CellInfo) -> bool {
        match self.position(&cell.key()) {
            Some(index) => {
                self.selected.remove(index);
                false
            }
            None => {
                self.selected.push(cell.clone());
                true
            }
        }
    }

    /// Selects every data cell of `grid`. Returns true if anything changed.
    pub fn select_all(&mut self, grid: &Grid) -> bool {
        let mut changed = false;
        for cell in grid.data_cells() {
            if self.position(&cell.key()).is_none() {
                self.selected.push(cell.clone());
                changed = true;
            }
        }
        changed
    }

    /// Returns true if anything was selected before.
    pub fn clear_selection(&mut self) -> bool {
        let changed = !self.selected.is_empty();
        self.selected.clear();
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, cell: &CellInfo) -> bool {
        self.position(&cell.key()).is_some()
    }

    pub fn selected_cells(&self) -> &[CellInfo] {
        &self.selected
    }

    /// Union of the selected cells' test sets, each narrowed from `base`.
    pub fn coalesce(&self, rows: &[HeaderField], columns: &[HeaderField], base: &Condition) -> TestSet {
        TestSet::from_cells(&self.selected, rows, columns, base)
    }
}
