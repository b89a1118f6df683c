//! Report tree built while units complete, and the sinks it is handed to.
//!
//! The serialized document looks like:
//!
//! ```text
//! { "classReports": [ { "name": "shop::Checkout",
//!                       "testReports": [ { "name": "pays", "status": "passed", ... } ],
//!                       "totalCount": 1, "successCount": 1, ... } ],
//!   "totalCount": 1, "successCount": 1, "failureCount": 0,
//!   "skippedCount": 0, "successRate": 100.0 }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::ReportError;
use crate::statement::DescriptionItem;

pub const DEFAULT_REPORT_DIR: &str = "target/giwt";
pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestStatus {
    #[serde(rename = "passed")]
    Success,
    #[serde(rename = "failed")]
    Failure,
    #[serde(rename = "skipped")]
    Skipped,
}

impl TestStatus {
    pub fn symbol(self) -> &'static str {
        match self {
            TestStatus::Success => "✅",
            TestStatus::Failure => "❌",
            TestStatus::Skipped => "❕",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TestStatus::Success => "passed",
            TestStatus::Failure => "failed",
            TestStatus::Skipped => "skipped",
        }
    }
}

/// Outcome of one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub name: String,
    pub symbol: &'static str,
    pub descriptions: Vec<DescriptionItem>,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stacktraces: Vec<String>,
    pub failure_reason: Option<String>,
}

impl TestReport {
    fn new(name: impl Into<String>, status: TestStatus, descriptions: Vec<DescriptionItem>) -> Self {
        TestReport {
            name: name.into(),
            symbol: status.symbol(),
            descriptions,
            status,
            stacktraces: Vec::new(),
            failure_reason: None,
        }
    }

    pub fn success(name: impl Into<String>, descriptions: Vec<DescriptionItem>) -> Self {
        TestReport::new(name, TestStatus::Success, descriptions)
    }

    pub fn failure(
        name: impl Into<String>,
        descriptions: Vec<DescriptionItem>,
        reason: impl Into<String>,
        stacktraces: Vec<String>,
    ) -> Self {
        TestReport {
            stacktraces,
            failure_reason: Some(reason.into()),
            ..TestReport::new(name, TestStatus::Failure, descriptions)
        }
    }

    pub fn skipped(name: impl Into<String>) -> Self {
        TestReport::new(name, TestStatus::Skipped, Vec::new())
    }
}

/// Total, success, failure and skipped counts with the success rate in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub total_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
    pub success_rate: f64,
}

impl Counts {
    fn of<'a>(reports: impl IntoIterator<Item = &'a TestReport>) -> Self {
        let mut counts = Counts::default();
        for report in reports {
            counts.total_count += 1;
            match report.status {
                TestStatus::Success => counts.success_count += 1,
                TestStatus::Failure => counts.failure_count += 1,
                TestStatus::Skipped => counts.skipped_count += 1,
            }
        }
        if counts.total_count > 0 {
            counts.success_rate =
                counts.success_count as f64 / counts.total_count as f64 * 100.0;
        }
        counts
    }
}

/// Reports of the units of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassReport {
    name: String,
    test_reports: Vec<TestReport>,
}

impl ClassReport {
    pub fn new(name: impl Into<String>) -> Self {
        ClassReport {
            name: name.into(),
            test_reports: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_test_report(&mut self, report: TestReport) {
        self.test_reports.push(report);
    }

    pub fn test_reports(&self) -> &[TestReport] {
        &self.test_reports
    }

    pub fn counts(&self) -> Counts {
        Counts::of(&self.test_reports)
    }
}

/// Every class report of a run, ordered by class name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCaseReport {
    class_reports: BTreeMap<String, ClassReport>,
}

impl TestCaseReport {
    pub fn new() -> Self {
        TestCaseReport::default()
    }

    /// The report of `class`, created empty on first use.
    pub fn class_report(&mut self, class: &str) -> &mut ClassReport {
        self.class_reports
            .entry(class.to_string())
            .or_insert_with(|| ClassReport::new(class))
    }

    pub fn get(&self, class: &str) -> Option<&ClassReport> {
        self.class_reports.get(class)
    }

    pub fn class_reports(&self) -> impl Iterator<Item = &ClassReport> {
        self.class_reports.values()
    }

    pub fn len(&self) -> usize {
        self.class_reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_reports.is_empty()
    }

    pub fn counts(&self) -> Counts {
        Counts::of(
            self.class_reports
                .values()
                .flat_map(|class| class.test_reports.iter()),
        )
    }

    pub fn document(&self) -> ReportDocument<'_> {
        ReportDocument {
            class_reports: self
                .class_reports
                .values()
                .map(|class| ClassDocument {
                    name: &class.name,
                    test_reports: &class.test_reports,
                    counts: class.counts(),
                })
                .collect(),
            counts: self.counts(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDocument<'a> {
    pub name: &'a str,
    pub test_reports: &'a [TestReport],
    #[serde(flatten)]
    pub counts: Counts,
}

/// Serializable view of a [`TestCaseReport`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument<'a> {
    pub class_reports: Vec<ClassDocument<'a>>,
    #[serde(flatten)]
    pub counts: Counts,
}

impl ReportDocument<'_> {
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Receives the finished report of a run.
pub trait ReportSink {
    fn process(&mut self, report: &ReportDocument<'_>) -> Result<(), ReportError>;
}

/// Writes the report as `report.json` into a directory.
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        JsonReportSink {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }
}

impl Default for JsonReportSink {
    fn default() -> Self {
        JsonReportSink::new(DEFAULT_REPORT_DIR)
    }
}

impl ReportSink for JsonReportSink {
    fn process(&mut self, report: &ReportDocument<'_>) -> Result<(), ReportError> {
        let json = report.to_json()?;
        fs::create_dir_all(&self.dir).map_err(|source| ReportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path();
        fs::write(&path, json).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "report written");
        Ok(())
    }
}
