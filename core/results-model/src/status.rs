//! FILENAME: core/results-model/src/status.rs
//! PURPOSE: The closed set of test statuses reported by the results database.
//! CONTEXT: Statuses drive pass counting in the pivot fold and the standard
//! exclusions (not-applicable and still-running tests) applied to every query.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a single test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Good,
    Warn,
    Fail,
    Error,
    Abort,
    Alert,
    Running,
    TestNa,
    Nostatus,
}

impl TestStatus {
    /// All statuses, in the order the results database numbers them.
    pub const ALL: [TestStatus; 9] = [
        TestStatus::Nostatus,
        TestStatus::Error,
        TestStatus::Abort,
        TestStatus::Fail,
        TestStatus::Warn,
        TestStatus::Good,
        TestStatus::Alert,
        TestStatus::TestNa,
        TestStatus::Running,
    ];

    /// The status word as stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Good => "GOOD",
            TestStatus::Warn => "WARN",
            TestStatus::Fail => "FAIL",
            TestStatus::Error => "ERROR",
            TestStatus::Abort => "ABORT",
            TestStatus::Alert => "ALERT",
            TestStatus::Running => "RUNNING",
            TestStatus::TestNa => "TEST_NA",
            TestStatus::Nostatus => "NOSTATUS",
        }
    }

    /// Only GOOD counts as a pass.
    pub fn is_pass(&self) -> bool {
        matches!(self, TestStatus::Good)
    }

    /// Whether the test has not produced a final result yet.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, TestStatus::Running | TestStatus::Nostatus)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status word is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown test status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for TestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
