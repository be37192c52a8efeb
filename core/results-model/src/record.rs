//! FILENAME: core/results-model/src/record.rs
//! PURPOSE: Defines the flat test-execution record handed to the pivot engine.
//! CONTEXT: A record is one row of the results table: a test index plus an
//! open-ended set of named string fields (kernel, platform, status, ...).
//! Records are produced by the external data source and are read-only to the
//! engine. Millions may be folded per query, so field storage stays flat.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::status::TestStatus;

/// Unique identifier of a test execution (the `test_idx` column).
pub type TestIndex = i64;

/// Marker for a missing/NULL field value.
/// Records lacking a field group under this value instead of being dropped.
pub const NULL_VALUE: &str = "<null>";

/// Name of the status column.
pub const STATUS_FIELD: &str = "status";

/// Name of the machine-labels column (comma-separated label list).
pub const MACHINE_LABELS_FIELD: &str = "machine_labels";

/// A single flat test-execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    /// The test's unique index.
    pub test_index: TestIndex,

    /// When the test finished, if known. Drives "most recent" aggregation.
    #[serde(default)]
    pub finished_at: Option<NaiveDateTime>,

    /// Named field values. Absent keys read as `NULL_VALUE`.
    #[serde(default)]
    fields: FxHashMap<String, String>,
}

impl TestRecord {
    pub fn new(test_index: TestIndex) -> Self {
        TestRecord {
            test_index,
            finished_at: None,
            fields: FxHashMap::default(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Builder-style finish time setter.
    pub fn with_finished_at(mut self, finished_at: NaiveDateTime) -> Self {
        self.finished_at = Some(finished_at);
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns the raw value of a field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns the field value, or `NULL_VALUE` when the record lacks it.
    pub fn value_or_null(&self, name: &str) -> &str {
        self.field(name).unwrap_or(NULL_VALUE)
    }

    /// Parsed status, if the record carries a recognised one.
    pub fn status(&self) -> Option<TestStatus> {
        self.field(STATUS_FIELD).and_then(|s| s.parse().ok())
    }

    /// Labels attached to the machine that ran this test.
    pub fn machine_labels(&self) -> impl Iterator<Item = &str> {
        self.field(MACHINE_LABELS_FIELD)
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Orders two records by recency: finish time first, then test index.
    /// A record with a finish time is newer than one without.
    pub fn recency_cmp(&self, other: &TestRecord) -> Ordering {
        match (self.finished_at, other.finished_at) {
            (Some(a), Some(b)) if a != b => a.cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            _ => self.test_index.cmp(&other.test_index),
        }
    }

    pub fn is_more_recent_than(&self, other: &TestRecord) -> bool {
        self.recency_cmp(other) == Ordering::Greater
    }
}
