//! FILENAME: core/pivot-engine/src/session.rs
//! Spreadsheet session - the event-driven controller of one pivot view.
//!
//! Ties navigation state, the grid, selection and drill-down together and
//! drives the host collaborators. Every fetch carries a generation number;
//! only the response to the latest one is applied, and it replaces the grid
//! in one piece. A failed fetch leaves the previous grid in place.
//!
//! Clicks, menus and drill-downs work on the state the published grid was
//! queried with, never on edits made since.

use results_model::{TestIndex, TestRecord, STATUS_FIELD};

use crate::condition::Condition;
use crate::config::EngineConfig;
use crate::drilldown::{DrilldownPolicy, DrilldownTarget, DrilldownType};
use crate::error::{FetchError, PivotError};
use crate::grid::{CellInfo, Grid};
use crate::grouper::{AggregationMode, CellGrouper};
use crate::header_field::{normalize_labels, validate_dimensions, FieldRegistry, HeaderField};
use crate::host::{LabelAction, QueryRequest, SessionHost, TableRequest, TableView};
use crate::navigation::{HistoryArgs, NavigationState};
use crate::selection::SelectionManager;
use crate::test_set::{ConditionTestSet, TestSet};
use crate::{log_debug, log_enter, log_error, log_exit, log_info, log_warn};

// ============================================================================
// EVENTS & OUTCOMES
// ============================================================================

/// How a cell was clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// Open the single test, or drill down with the default dimensions.
    Plain,
    /// Toggle the cell in the multi-selection.
    Select,
    /// Ask for the context menu.
    Context,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    OpenedTest(TestIndex),
    DrilledDown { target: DrilldownTarget, generation: u64 },
    SelectionToggled { selected: bool },
    Menu(ContextMenu),
}

/// What became of a fetch response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The grid was replaced.
    Applied,
    /// A newer query was issued since; the response was dropped.
    Stale,
    /// The fetch failed; the previous grid is kept.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextAction {
    ViewDetails(TestIndex),
    Drilldown(DrilldownTarget),
    ViewInTable,
    TriageFailures,
    AddLabel,
    RemoveLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub label: String,
    pub action: ContextAction,
    /// History arguments of the view this item leads to, for drill-down items.
    pub link: Option<HistoryArgs>,
}

/// Actions offered for one test set.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    tests: TestSet,
    drill: DrilldownType,
    items: Vec<MenuItem>,
}

impl ContextMenu {
    pub fn tests(&self) -> &TestSet {
        &self.tests
    }

    pub fn drill_type(&self) -> DrilldownType {
        self.drill
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn actions(&self) -> impl Iterator<Item = &ContextAction> + '_ {
        self.items.iter().map(|item| &item.action)
    }
}

/// The navigation state a query was issued for and the filter it sent.
#[derive(Debug, Clone)]
struct QuerySnapshot {
    state: NavigationState,
    filter: Condition,
}

#[derive(Debug, Clone)]
struct PendingQuery {
    generation: u64,
    snapshot: QuerySnapshot,
}

// ============================================================================
// SESSION
// ============================================================================

pub struct SpreadsheetSession<H: SessionHost> {
    host: H,
    config: EngineConfig,
    registry: FieldRegistry,
    policy: DrilldownPolicy,
    state: NavigationState,
    grid: Grid,
    /// What the published grid was queried with.
    shown: QuerySnapshot,
    selection: SelectionManager,
    generation: u64,
    pending: Option<PendingQuery>,
    has_queried: bool,
}

impl<H: SessionHost> SpreadsheetSession<H> {
    pub fn new(host: H, config: EngineConfig) -> Result<Self, PivotError> {
        let registry = config.registry()?;
        let policy = config.drilldown_policy();
        let state = NavigationState::default_for(&registry)?;
        let shown = QuerySnapshot {
            filter: state.query_condition(&config.excluded_statuses, &config.incomplete_statuses),
            state: state.clone(),
        };
        Ok(SpreadsheetSession {
            host,
            shown,
            config,
            registry,
            policy,
            state,
            grid: Grid::empty(AggregationMode::StatusCount),
            selection: SelectionManager::new(),
            generation: 0,
            pending: None,
            has_queried: false,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    /// Generation of the most recently issued query (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    // ========================================================================
    // STATE EDITS
    // ========================================================================

    fn resolve_fields(&self, columns: &[&str]) -> Result<Vec<HeaderField>, PivotError> {
        columns
            .iter()
            .map(|column| {
                let active = self
                    .state
                    .rows
                    .iter()
                    .chain(&self.state.columns)
                    .find(|field| field.column_name() == *column);
                match active {
                    Some(field) => Ok(field.clone()),
                    None => self.registry.create(column),
                }
            })
            .collect()
    }

    /// Replaces the row dimensions. Takes effect on the next query.
    pub fn set_row_fields(&mut self, columns: &[&str]) -> Result<(), PivotError> {
        self.state.rows = self.resolve_fields(columns)?;
        Ok(())
    }

    pub fn set_column_fields(&mut self, columns: &[&str]) -> Result<(), PivotError> {
        self.state.columns = self.resolve_fields(columns)?;
        Ok(())
    }

    /// Sets the candidate labels of every active machine-label field on
    /// `column`. Entries are split on ',' and trimmed.
    pub fn set_label_list(&mut self, column: &str, labels: Vec<String>) -> Result<(), PivotError> {
        let labels = normalize_labels(labels);
        let mut found = false;
        for field in self.state.rows.iter_mut().chain(self.state.columns.iter_mut()) {
            if field.column_name() != column {
                continue;
            }
            if let Some(list) = field.label_list_mut() {
                *list = labels.clone();
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(PivotError::UnknownField(column.to_string()))
        }
    }

    pub fn set_condition(&mut self, condition: impl Into<String>) {
        self.state.condition = condition.into();
    }

    pub fn set_show_incomplete(&mut self, show: bool) {
        self.state.show_incomplete = show;
    }

    pub fn set_show_only_latest(&mut self, show: bool) {
        self.state.show_only_latest = show;
    }

    /// Exchanges the row and column dimensions and re-queries.
    pub fn swap_axes(&mut self) -> Result<u64, PivotError> {
        self.state.swap_axes();
        self.query_and_record()
    }

    // ========================================================================
    // QUERY
    // ========================================================================

    /// Validates the current state and issues a fetch for it.
    ///
    /// Validation errors are reported to the notifier and returned; no fetch
    /// is issued and the generation is not advanced.
    pub fn do_query(&mut self) -> Result<u64, PivotError> {
        log_enter!("QUERY", "do_query");
        if let Err(error) = validate_dimensions(&self.state.rows, &self.state.columns) {
            log_warn!("QUERY", "rejected: {}", error);
            self.host.show_error(&error.to_string());
            return Err(error);
        }

        self.generation += 1;
        let mode = self.state.aggregation_mode();
        let condition = self
            .state
            .query_condition(&self.config.excluded_statuses, &self.config.incomplete_statuses);
        let request = QueryRequest {
            generation: self.generation,
            condition,
            mode,
            row_columns: self.state.rows.iter().map(|f| f.column_name().to_string()).collect(),
            column_columns: self.state.columns.iter().map(|f| f.column_name().to_string()).collect(),
        };
        log_info!(
            "QUERY",
            "generation={} mode={:?} condition='{}'",
            request.generation,
            mode,
            request.sql()
        );

        if self.selection.clear_selection() {
            self.host.refresh_selection(self.selection.selected_cells());
        }
        self.pending = Some(PendingQuery {
            generation: self.generation,
            snapshot: QuerySnapshot {
                state: self.state.clone(),
                filter: request.condition.clone(),
            },
        });
        self.has_queried = true;
        self.host.set_loading(true);
        self.host.fetch(&request);

        log_exit!("QUERY", "do_query", "generation={}", self.generation);
        Ok(self.generation)
    }

    /// Issues a query and records the resulting state as a history entry.
    pub fn query_and_record(&mut self) -> Result<u64, PivotError> {
        let generation = self.do_query()?;
        self.host.push_history(&self.state.to_history_args());
        Ok(generation)
    }

    /// Delivers the data source's answer to the fetch stamped `generation`.
    pub fn handle_fetch_result(
        &mut self,
        generation: u64,
        result: Result<Vec<TestRecord>, FetchError>,
    ) -> FetchOutcome {
        let pending = match self.pending.take() {
            Some(pending) if pending.generation == generation => pending,
            other => {
                self.pending = other;
                log_debug!(
                    "FETCH",
                    "dropping stale response generation={} (current={})",
                    generation,
                    self.generation
                );
                return FetchOutcome::Stale;
            }
        };
        self.host.set_loading(false);

        let records = match result {
            Ok(records) => records,
            Err(error) => {
                log_error!("FETCH", "generation={} failed: {}", generation, error);
                self.host.show_error(&error.to_string());
                return FetchOutcome::Failed;
            }
        };

        let shown = pending.snapshot;
        let mode = shown.state.aggregation_mode();
        let grouper = match CellGrouper::new(&shown.state.rows, &shown.state.columns, mode) {
            Ok(grouper) => grouper.with_sort(self.config.header_sort),
            Err(error) => {
                log_error!("FETCH", "generation={} cannot be grouped: {}", generation, error);
                self.host.show_error(&error.to_string());
                return FetchOutcome::Failed;
            }
        };
        let grid = grouper.fold(&records);
        log_info!(
            "FETCH",
            "generation={} published rows={} columns={} cells={} tests={}",
            generation,
            grid.row_count(),
            grid.column_count(),
            grid.cell_count(),
            grid.total_tests()
        );

        self.grid = grid;
        self.shown = shown;
        self.host.render(&self.grid);
        FetchOutcome::Applied
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    /// Arguments for the current history entry; `None` until the first query.
    pub fn history_args(&self) -> Option<HistoryArgs> {
        if self.has_queried {
            Some(self.state.to_history_args())
        } else {
            None
        }
    }

    /// Restores a history entry and re-queries without pushing a new entry.
    pub fn handle_history_args(&mut self, args: &HistoryArgs) -> Result<u64, PivotError> {
        let state = NavigationState::from_history_args(args, &self.registry)?;
        log_info!("HISTORY", "restoring condition='{}'", state.condition);
        self.state = state;
        if self.selection.clear_selection() {
            self.host.refresh_selection(self.selection.selected_cells());
        }
        self.do_query()
    }

    // ========================================================================
    // TEST SETS
    // ========================================================================

    /// Tests behind one cell of the published grid.
    pub fn test_set_for(&self, cell: &CellInfo) -> TestSet {
        let shown = &self.shown;
        TestSet::from_cell(cell, &shown.state.rows, &shown.state.columns, &shown.filter)
    }

    /// Union of the selected cells' tests.
    pub fn selection_test_set(&self) -> TestSet {
        let shown = &self.shown;
        self.selection
            .coalesce(&shown.state.rows, &shown.state.columns, &shown.filter)
    }

    /// Every test in the published grid.
    pub fn whole_table_test_set(&self) -> TestSet {
        if self.grid.total_tests() == 1 {
            if let Some(cell) = self.grid.last_cell() {
                return self.test_set_for(cell);
            }
        }

        if self.shown.state.show_only_latest {
            let mut tests = ConditionTestSet::default();
            tests.add_condition(Condition::TestIndexIn(self.grid.all_test_indices()));
            return TestSet::Condition(tests);
        }

        TestSet::Condition(ConditionTestSet::new(self.shown.filter.clone()))
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    pub fn select_all(&mut self) {
        if self.selection.select_all(&self.grid) {
            log_debug!("SELECT", "selected all {} cells", self.selection.len());
            self.host.refresh_selection(self.selection.selected_cells());
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear_selection() {
            log_debug!("SELECT", "cleared selection");
            self.host.refresh_selection(self.selection.selected_cells());
        }
    }

    // ========================================================================
    // CELL EVENTS
    // ========================================================================

    pub fn on_cell_clicked(&mut self, cell: &CellInfo, kind: ClickKind) -> Result<ClickOutcome, PivotError> {
        match kind {
            ClickKind::Select => {
                let selected = self.selection.toggle_selected(cell);
                log_debug!("SELECT", "toggled {:?} -> {}", cell.key(), selected);
                self.host.refresh_selection(self.selection.selected_cells());
                Ok(ClickOutcome::SelectionToggled { selected })
            }
            ClickKind::Context => {
                let menu = if self.selection.is_empty() {
                    self.context_menu(self.test_set_for(cell), DrilldownType::from_cell(cell))
                } else {
                    self.context_menu(self.selection_test_set(), DrilldownType::Both)
                };
                Ok(ClickOutcome::Menu(menu))
            }
            ClickKind::Plain => {
                let tests = self.test_set_for(cell);
                if let Some(test_index) = tests.test_index() {
                    self.host.open_test(test_index);
                    return Ok(ClickOutcome::OpenedTest(test_index));
                }
                let drill = DrilldownType::from_cell(cell);
                let target = self
                    .policy
                    .default_target(&self.shown.state.rows, &self.shown.state.columns, drill)
                    .ok_or(PivotError::EmptyDimensions)?;
                let generation = self.drill_down(&tests, &target)?;
                Ok(ClickOutcome::DrilledDown { target, generation })
            }
        }
    }

    /// Narrows the published view to `tests`, pivots on `target`, records
    /// history and re-queries. Unqueried edits to the state are discarded.
    pub fn drill_down(&mut self, tests: &TestSet, target: &DrilldownTarget) -> Result<u64, PivotError> {
        let shown = &self.shown.state;
        log_info!(
            "DRILL",
            "{} vs. {} -> {}",
            shown.rows.last().map_or("", |f| f.column_name()),
            shown.columns.last().map_or("", |f| f.column_name()),
            target
        );
        self.state = shown.drilled(tests, target, &self.registry)?;
        self.query_and_record()
    }

    /// Menu for the selection when there is one, otherwise the whole table.
    pub fn action_menu(&self) -> ContextMenu {
        let tests = if self.selection.is_empty() {
            self.whole_table_test_set()
        } else {
            self.selection_test_set()
        };
        self.context_menu(tests, DrilldownType::Both)
    }

    pub fn context_menu(&self, tests: TestSet, drill: DrilldownType) -> ContextMenu {
        let mut items = Vec::new();
        match tests.test_index() {
            Some(test_index) => items.push(MenuItem {
                label: "View test details".to_string(),
                action: ContextAction::ViewDetails(test_index),
                link: None,
            }),
            None => {
                let shown = &self.shown.state;
                for target in self.policy.menu_options(&shown.rows, &shown.columns, drill) {
                    let link = shown
                        .drilled(&tests, &target, &self.registry)
                        .ok()
                        .map(|next| next.to_history_args());
                    items.push(MenuItem {
                        label: format!("Drill down: {}", target),
                        action: ContextAction::Drilldown(target),
                        link,
                    });
                }
            }
        }

        for (label, action) in [
            ("View in table", ContextAction::ViewInTable),
            ("Triage failures", ContextAction::TriageFailures),
            ("Add label", ContextAction::AddLabel),
            ("Remove label", ContextAction::RemoveLabel),
        ] {
            items.push(MenuItem {
                label: label.to_string(),
                action,
                link: None,
            });
        }

        ContextMenu { tests, drill, items }
    }

    /// Runs one menu action against the menu's test set.
    pub fn execute(&mut self, menu: &ContextMenu, action: &ContextAction) -> Result<(), PivotError> {
        match action {
            ContextAction::ViewDetails(test_index) => self.host.open_test(*test_index),
            ContextAction::Drilldown(target) => {
                self.drill_down(&menu.tests, target)?;
            }
            ContextAction::ViewInTable => self.switch_to_table(&menu.tests, TableView::Default),
            ContextAction::TriageFailures => self.switch_to_table(&menu.tests, TableView::Triage),
            ContextAction::AddLabel => self.host.edit_labels(LabelAction::Add, &menu.tests.condition()),
            ContextAction::RemoveLabel => {
                self.host.edit_labels(LabelAction::Remove, &menu.tests.condition())
            }
        }
        Ok(())
    }

    fn switch_to_table(&mut self, tests: &TestSet, view: TableView) {
        self.state.condition = tests.condition().to_string();
        if view == TableView::Triage {
            let triage = Condition::not_equals(STATUS_FIELD, &self.config.triage_status);
            self.state.refine_condition(triage);
        }
        log_info!("DRILL", "switching to {:?} table, condition='{}'", view, self.state.condition);
        let request = TableRequest {
            condition: self.state.condition.clone(),
            view,
        };
        self.host.open_table(&request);
    }
}
