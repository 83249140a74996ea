//! Shared type definitions for Parrot.
//!
//! This crate holds the data exchanged between sources, drains and the session
//! orchestrator: the [`TestResult`] model every source produces and every
//! drain consumes, plus the persisted configuration document written by a
//! fresh session and read back during replay (see [`config`]).

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{NamedConfiguration, PersistedConfiguration, SerializedDrain, SerializedSource};

/// Execution status of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Pending,
    Skipped,
}

impl TestStatus {
    /// All statuses in the order reports list them.
    pub const ALL: [TestStatus; 4] = [TestStatus::Pass, TestStatus::Pending, TestStatus::Skipped, TestStatus::Fail];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Pending => "pending",
            TestStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing where a test result was executed (e.g. a test execution issue).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestExecutionMetadata {
    /// Link to the execution context of the result.
    pub url: String,
}

/// A single test and its most recent result, as reported by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Identifier of the test within its source system (e.g. an issue key).
    pub id: String,
    /// Human-readable test name.
    pub name: String,
    /// Link to the test itself.
    #[serde(default)]
    pub url: String,
    /// Outcome of the latest execution.
    pub status: TestStatus,
    /// Where the result was produced.
    #[serde(default)]
    pub execution_metadata: TestExecutionMetadata,
}

impl TestResult {
    /// Convenience constructor for results without links.
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: TestStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: String::new(),
            status,
            execution_metadata: TestExecutionMetadata::default(),
        }
    }
}

/// Percentage of passing results, `0.0` for an empty slice.
pub fn passing_percentage(results: &[TestResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passing = results.iter().filter(|result| result.status == TestStatus::Pass).count();
    100.0 * passing as f64 / results.len() as f64
}
