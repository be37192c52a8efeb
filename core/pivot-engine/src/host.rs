//! FILENAME: core/pivot-engine/src/host.rs
//! Host collaborators - everything the engine drives but does not own.
//!
//! The session talks to its host only through these traits: it issues
//! fire-and-forget fetches, hands finished grids to a render surface, and
//! asks the view layer to record history or switch views. Responses come
//! back through `SpreadsheetSession::handle_fetch_result`.

use serde::{Deserialize, Serialize};

use results_model::TestIndex;

use crate::condition::Condition;
use crate::grid::{CellInfo, Grid};
use crate::grouper::AggregationMode;
use crate::navigation::HistoryArgs;

// ============================================================================
// REQUESTS
// ============================================================================

/// One generation-stamped fetch for the pivot's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Echo this back with the response; stale generations are dropped.
    pub generation: u64,
    pub condition: Condition,
    pub mode: AggregationMode,
    /// Columns the records must carry for the row dimensions.
    pub row_columns: Vec<String>,
    pub column_columns: Vec<String>,
}

impl QueryRequest {
    /// Condition text for the backend.
    pub fn sql(&self) -> String {
        self.condition.to_sql()
    }

    /// Every column referenced by the active dimensions, rows first.
    pub fn group_columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.row_columns
            .iter()
            .chain(&self.column_columns)
            .map(String::as_str)
    }
}

/// Preset of the flat table view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableView {
    #[default]
    Default,
    /// Failure triage: passing tests already filtered out.
    Triage,
}

/// Switch to the flat table view over `condition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRequest {
    pub condition: String,
    pub view: TableView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelAction {
    Add,
    Remove,
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Asynchronous record source.
pub trait DataSource {
    /// Starts a fetch. The answer arrives later via
    /// `SpreadsheetSession::handle_fetch_result(request.generation, ..)`.
    fn fetch(&mut self, request: &QueryRequest);
}

pub trait RenderSurface {
    fn render(&mut self, grid: &Grid);
    /// The selection changed; redraw highlight state.
    fn refresh_selection(&mut self, selected: &[CellInfo]);
    fn set_loading(&mut self, loading: bool);
}

/// History entries and switches to other views.
pub trait ViewSwitcher {
    fn push_history(&mut self, args: &HistoryArgs);
    fn open_test(&mut self, test_index: TestIndex);
    fn open_table(&mut self, request: &TableRequest);
}

/// Adds or removes user labels on every test matching a condition.
pub trait LabelEditor {
    fn edit_labels(&mut self, action: LabelAction, condition: &Condition);
}

/// User-visible notifications.
pub trait Notifier {
    fn show_error(&mut self, message: &str);
}

/// Everything a session needs from its host.
pub trait SessionHost: DataSource + RenderSurface + ViewSwitcher + LabelEditor + Notifier {}

impl<T> SessionHost for T where T: DataSource + RenderSurface + ViewSwitcher + LabelEditor + Notifier {}
