//! FILENAME: tests/test_scenarios.rs
//! End-to-end pivot scenarios: folding, validation, coalescing, stale fetches.

mod common;

use common::{new_session, query_with, ResultsFixture};
use pivot_engine::{
    calculate_grid, AggregationMode, ClickKind, FetchOutcome, Header, HeaderField, HeaderSort,
    PivotError,
};

// ============================================================================
// FOLDING
// ============================================================================

#[test]
fn test_platform_by_status_grid() {
    let rows = vec![HeaderField::simple("Platform", "platform")];
    let columns = vec![HeaderField::simple("Status", "status")];
    let grid = calculate_grid(
        &ResultsFixture::platform_status(),
        &rows,
        &columns,
        AggregationMode::StatusCount,
        HeaderSort::FirstAppearance,
    )
    .unwrap();

    let count = |row: &str, column: &str| {
        grid.cell(&Header::new([row]), &Header::new([column]))
            .map_or(0, |cell| cell.test_count)
    };
    assert_eq!(count("x64", "GOOD"), 1);
    assert_eq!(count("x64", "FAIL"), 1);
    assert_eq!(count("arm", "GOOD"), 1);
    assert_eq!(count("arm", "FAIL"), 0);
    assert_eq!(grid.cell_count(), 3);
}

#[test]
fn test_session_publishes_grid_for_default_dimensions() {
    let mut session = new_session();
    query_with(&mut session, ResultsFixture::nightly());

    let grid = session.grid();
    assert_eq!(grid.rows(), &[Header::new(["2.6.18"]), Header::new(["2.6.24"])]);
    assert_eq!(grid.columns(), &[Header::new(["x64"]), Header::new(["arm"])]);
    assert_eq!(grid.total_tests(), 8);

    let cell = grid.cell(&Header::new(["2.6.18"]), &Header::new(["x64"])).unwrap();
    assert_eq!(cell.test_count, 3);
    assert_eq!(cell.pass_count, 2);
    assert_eq!(cell.summary(AggregationMode::StatusCount), "2/3");
    assert_eq!(session.host().rendered.len(), 1);
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_empty_label_list_blocks_query() {
    let mut session = new_session();
    session.set_column_fields(&["machine_labels"]).unwrap();

    let error = session.do_query().unwrap_err();
    assert!(matches!(error, PivotError::EmptyLabelList { .. }));
    assert!(error.is_validation());
    assert!(session.host().fetches.is_empty());
    assert_eq!(session.host().errors.len(), 1);
    assert_eq!(session.generation(), 0);
}

#[test]
fn test_empty_dimensions_block_query() {
    let mut session = new_session();
    session.set_row_fields(&[]).unwrap();

    assert!(matches!(session.do_query(), Err(PivotError::EmptyDimensions)));
    assert!(session.host().fetches.is_empty());
    assert_eq!(session.host().errors, vec!["You must select row and column fields"]);
}

// ============================================================================
// COALESCING
// ============================================================================

#[test]
fn test_two_selected_cells_coalesce_into_union() {
    let mut session = new_session();
    session.set_row_fields(&["platform"]).unwrap();
    session.set_column_fields(&["status"]).unwrap();
    let mut records = ResultsFixture::platform_status();
    records.push(ResultsFixture::record(4, &[("platform", "x64"), ("status", "GOOD")]));
    records.push(ResultsFixture::record(5, &[("platform", "arm"), ("status", "GOOD")]));
    query_with(&mut session, records);

    let x64_good = session
        .grid()
        .cell(&Header::new(["x64"]), &Header::new(["GOOD"]))
        .cloned()
        .unwrap();
    let arm_good = session
        .grid()
        .cell(&Header::new(["arm"]), &Header::new(["GOOD"]))
        .cloned()
        .unwrap();
    session.on_cell_clicked(&x64_good, ClickKind::Select).unwrap();
    session.on_cell_clicked(&arm_good, ClickKind::Select).unwrap();

    let tests = session.selection_test_set();
    assert!(!tests.is_single_test());
    assert_eq!(
        tests.partial_condition().to_sql(),
        "(platform='x64' AND status='GOOD') OR (platform='arm' AND status='GOOD')"
    );
    assert_eq!(
        tests.condition().to_sql(),
        "status != 'TEST_NA' AND status != 'RUNNING' AND \
         ((platform='x64' AND status='GOOD') OR (platform='arm' AND status='GOOD'))"
    );
    assert_eq!(session.host().selection_refreshes.len(), 2);
}

#[test]
fn test_two_single_test_cells_coalesce_into_index_union() {
    let mut session = new_session();
    session.set_row_fields(&["platform"]).unwrap();
    session.set_column_fields(&["status"]).unwrap();
    query_with(&mut session, ResultsFixture::platform_status());

    let cells: Vec<_> = [("x64", "GOOD"), ("arm", "GOOD")]
        .iter()
        .map(|(row, column)| {
            session
                .grid()
                .cell(&Header::new([*row]), &Header::new([*column]))
                .cloned()
                .unwrap()
        })
        .collect();
    for cell in &cells {
        assert_eq!(cell.test_count, 1);
        session.on_cell_clicked(cell, ClickKind::Select).unwrap();
    }

    let tests = session.selection_test_set();
    assert!(!tests.is_single_test());
    assert_eq!(tests.test_index(), None);
    assert_eq!(tests.partial_condition().to_sql(), "(test_idx=1) OR (test_idx=3)");
    assert_eq!(
        tests.condition().to_sql(),
        "status != 'TEST_NA' AND status != 'RUNNING' AND ((test_idx=1) OR (test_idx=3))"
    );
}

#[test]
fn test_single_selected_cell_keeps_single_test_shortcut() {
    let mut session = new_session();
    session.set_row_fields(&["platform"]).unwrap();
    session.set_column_fields(&["status"]).unwrap();
    query_with(&mut session, ResultsFixture::platform_status());

    let arm_good = session
        .grid()
        .cell(&Header::new(["arm"]), &Header::new(["GOOD"]))
        .cloned()
        .unwrap();
    session.on_cell_clicked(&arm_good, ClickKind::Select).unwrap();

    let tests = session.selection_test_set();
    assert!(tests.is_single_test());
    assert_eq!(tests.test_index(), Some(3));
}

// ============================================================================
// STALE RESPONSES
// ============================================================================

#[test]
fn test_stale_response_is_dropped() {
    let mut session = new_session();
    let first = session.do_query().unwrap();
    session.set_show_incomplete(true);
    let second = session.do_query().unwrap();
    assert_eq!((first, second), (1, 2));

    let stale = ResultsFixture::platform_status();
    assert_eq!(session.handle_fetch_result(first, Ok(stale)), FetchOutcome::Stale);
    assert!(session.grid().is_empty());
    assert!(session.is_loading());

    assert_eq!(
        session.handle_fetch_result(second, Ok(ResultsFixture::nightly())),
        FetchOutcome::Applied
    );
    assert_eq!(session.grid().total_tests(), 8);

    let late = ResultsFixture::platform_status();
    assert_eq!(session.handle_fetch_result(first, Ok(late)), FetchOutcome::Stale);
    assert_eq!(session.grid().total_tests(), 8);
    assert_eq!(session.host().rendered.len(), 1);
}
