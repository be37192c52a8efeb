//! FILENAME: core/pivot-engine/src/lib.rs
//! Pivot and drill-down engine for test-results analysis.
//!
//! Folds flat test records into a row/column grid, turns clicked cells and
//! selections into composable filter conditions, and drives drill-down and
//! history navigation on top of that grid. Record fetching, rendering and
//! view switching are left to the host through the traits in `host`.
//!
//! Layers:
//! - `condition`, `header_field`: what a pivot can group by and filter on
//! - `grid`, `grouper`: the fold and its renderable output
//! - `test_set`, `selection`: which tests a click or selection refers to
//! - `drilldown`, `navigation`: where a drill goes and how state is recorded
//! - `session`: the event-driven controller tying it together

pub mod condition;
pub mod config;
pub mod drilldown;
pub mod error;
pub mod grid;
pub mod grouper;
pub mod header_field;
pub mod host;
pub mod logging;
pub mod navigation;
pub mod selection;
pub mod session;
pub mod test_set;

pub use condition::{escape_sql_value, Condition, TEST_INDEX_FIELD};
pub use config::EngineConfig;
pub use drilldown::{DrilldownPolicy, DrilldownRule, DrilldownTarget, DrilldownType};
pub use error::{FetchError, PivotError};
pub use grid::{CellInfo, CellKey, Grid, Header};
pub use grouper::{calculate_grid, AggregationMode, CellGrouper, HeaderSort};
pub use header_field::{
    normalize_labels, standard_group_fields, validate_dimensions, FieldKind, FieldRegistry,
    FieldSpec, HeaderField, MachineLabelField, SimpleHeaderField,
};
pub use host::{
    DataSource, LabelAction, LabelEditor, Notifier, QueryRequest, RenderSurface, SessionHost,
    TableRequest, TableView, ViewSwitcher,
};
pub use navigation::{HistoryArgs, NavigationState, HISTORY_FORMAT_VERSION};
pub use selection::SelectionManager;
pub use session::{
    ClickKind, ClickOutcome, ContextAction, ContextMenu, FetchOutcome, MenuItem, SpreadsheetSession,
};
pub use test_set::{CompositeTestSet, ConditionTestSet, SingleTestSet, TestSet};

pub use results_model::{TestIndex, TestRecord, TestStatus, NULL_VALUE};
