//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for pivot engine integration tests.

#![allow(dead_code)]

use pivot_engine::{
    CellInfo, Condition, DataSource, EngineConfig, Grid, HistoryArgs, LabelAction, LabelEditor,
    Notifier, QueryRequest, RenderSurface, SpreadsheetSession, TableRequest, TestIndex, TestRecord,
    ViewSwitcher,
};

/// Host double that records every call the session makes.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub fetches: Vec<QueryRequest>,
    pub rendered: Vec<Grid>,
    pub selection_refreshes: Vec<Vec<CellInfo>>,
    pub loading: Vec<bool>,
    pub history: Vec<HistoryArgs>,
    pub opened_tests: Vec<TestIndex>,
    pub tables: Vec<TableRequest>,
    pub label_edits: Vec<(LabelAction, String)>,
    pub errors: Vec<String>,
}

impl RecordingHost {
    pub fn last_fetch(&self) -> &QueryRequest {
        self.fetches.last().expect("no fetch was issued")
    }

    pub fn last_grid(&self) -> &Grid {
        self.rendered.last().expect("no grid was rendered")
    }
}

impl DataSource for RecordingHost {
    fn fetch(&mut self, request: &QueryRequest) {
        self.fetches.push(request.clone());
    }
}

impl RenderSurface for RecordingHost {
    fn render(&mut self, grid: &Grid) {
        self.rendered.push(grid.clone());
    }

    fn refresh_selection(&mut self, selected: &[CellInfo]) {
        self.selection_refreshes.push(selected.to_vec());
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading.push(loading);
    }
}

impl ViewSwitcher for RecordingHost {
    fn push_history(&mut self, args: &HistoryArgs) {
        self.history.push(args.clone());
    }

    fn open_test(&mut self, test_index: TestIndex) {
        self.opened_tests.push(test_index);
    }

    fn open_table(&mut self, request: &TableRequest) {
        self.tables.push(request.clone());
    }
}

impl LabelEditor for RecordingHost {
    fn edit_labels(&mut self, action: LabelAction, condition: &Condition) {
        self.label_edits.push((action, condition.to_sql()));
    }
}

impl Notifier for RecordingHost {
    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

/// A session over a fresh recording host with the default configuration.
pub fn new_session() -> SpreadsheetSession<RecordingHost> {
    SpreadsheetSession::new(RecordingHost::default(), EngineConfig::default())
        .expect("default configuration is valid")
}

/// Issues a query and answers it with `records`.
pub fn query_with(session: &mut SpreadsheetSession<RecordingHost>, records: Vec<TestRecord>) -> u64 {
    let generation = session.do_query().expect("query should be accepted");
    session.handle_fetch_result(generation, Ok(records));
    generation
}

/// Test records shaped like a small nightly run.
pub struct ResultsFixture;

impl ResultsFixture {
    pub fn record(index: TestIndex, fields: &[(&str, &str)]) -> TestRecord {
        fields
            .iter()
            .fold(TestRecord::new(index), |record, (name, value)| record.with_field(*name, *value))
    }

    /// Three records over platform x status.
    pub fn platform_status() -> Vec<TestRecord> {
        vec![
            Self::record(1, &[("platform", "x64"), ("status", "GOOD")]),
            Self::record(2, &[("platform", "x64"), ("status", "FAIL")]),
            Self::record(3, &[("platform", "arm"), ("status", "GOOD")]),
        ]
    }

    /// Kernel x platform records with hostnames, tests and machine labels.
    pub fn nightly() -> Vec<TestRecord> {
        let rows: [(TestIndex, &str, &str, &str, &str, &str, &str); 8] = [
            (10, "2.6.18", "x64", "host1", "dbench", "GOOD", "bvt,x86"),
            (11, "2.6.18", "x64", "host1", "kernbench", "FAIL", "bvt,x86"),
            (12, "2.6.18", "x64", "host2", "dbench", "GOOD", "x86"),
            (13, "2.6.18", "arm", "host3", "dbench", "GOOD", "arm,bvt"),
            (14, "2.6.24", "x64", "host1", "dbench", "GOOD", "bvt,x86"),
            (15, "2.6.24", "arm", "host3", "kernbench", "ERROR", "arm,bvt"),
            (16, "2.6.24", "arm", "host4", "kernbench", "FAIL", "arm"),
            (17, "2.6.24", "x64", "host2", "dbench", "GOOD", ""),
        ];
        rows.iter()
            .map(|(index, kernel, platform, hostname, test, status, labels)| {
                Self::record(
                    *index,
                    &[
                        ("kernel", *kernel),
                        ("platform", *platform),
                        ("hostname", *hostname),
                        ("test_name", *test),
                        ("status", *status),
                        ("machine_labels", *labels),
                    ],
                )
            })
            .collect()
    }

    /// `count` records spread over a handful of kernels, platforms and statuses.
    pub fn large(count: usize) -> Vec<TestRecord> {
        const KERNELS: [&str; 5] = ["2.6.18", "2.6.24", "2.6.26", "2.6.30", "3.0"];
        const PLATFORMS: [&str; 4] = ["x64", "arm", "ppc", "mips"];
        const STATUSES: [&str; 3] = ["GOOD", "FAIL", "ERROR"];
        (0..count)
            .map(|i| {
                Self::record(
                    i as TestIndex,
                    &[
                        ("kernel", KERNELS[i % KERNELS.len()]),
                        ("platform", PLATFORMS[(i / 3) % PLATFORMS.len()]),
                        ("status", STATUSES[(i / 7) % STATUSES.len()]),
                    ],
                )
            })
            .collect()
    }
}
