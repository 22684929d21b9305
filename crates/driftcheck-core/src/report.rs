//! Report generation: run metadata plus the serialized aggregate.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::baseline::GENERATED_AT_FORMAT;
use crate::error::Result;
use crate::outcome::TestRecord;
use crate::summary::{exit_status_for, ExitStatus, RunSummary, SummaryCounts};

/// The compiler a run was executed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerIdentity {
    pub path: PathBuf,
    /// `--version` output, or `modified_<mtime>` when unsupported.
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub generated_at: String,
    pub compiler_path: String,
    pub compiler_version: String,
    pub run_id: Uuid,
    pub scripts_discovered: usize,
    pub interrupted: bool,
}

/// The machine-readable result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub summary: SummaryCounts,
    pub tests: Vec<TestRecord>,
    pub regressions: Vec<TestRecord>,
    pub new_tests: Vec<TestRecord>,
    /// Seconds.
    pub execution_time: f64,
    pub metadata: ReportMetadata,
}

impl AggregateReport {
    pub fn exit_status(&self) -> ExitStatus {
        exit_status_for(self.regressions.len(), self.summary.failed)
    }
}

/// Attaches metadata to a finished run and writes it out.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    reports_dir: PathBuf,
    project_root: Option<PathBuf>,
}

impl ReportGenerator {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            project_root: None,
        }
    }

    /// Record the compiler path relative to `root` when it lies beneath it.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn finalize(&self, summary: RunSummary, compiler: &CompilerIdentity) -> AggregateReport {
        let compiler_path = self
            .project_root
            .as_deref()
            .and_then(|root| compiler.path.strip_prefix(root).ok())
            .unwrap_or(compiler.path.as_path())
            .display()
            .to_string();

        AggregateReport {
            summary: summary.counts,
            tests: summary.tests,
            regressions: summary.regressions,
            new_tests: summary.new_tests,
            execution_time: summary.execution_time.as_secs_f64(),
            metadata: ReportMetadata {
                generated_at: Local::now().format(GENERATED_AT_FORMAT).to_string(),
                compiler_path,
                compiler_version: compiler.version.clone(),
                run_id: Uuid::new_v4(),
                scripts_discovered: summary.discovered,
                interrupted: summary.interrupted,
            },
        }
    }

    /// `<reports_dir>/test_report_<YYYYmmdd_HHMMSS>.json`
    pub fn default_path(&self, at: DateTime<Local>) -> PathBuf {
        self.reports_dir
            .join(format!("test_report_{}.json", at.format("%Y%m%d_%H%M%S")))
    }

    /// Serialize `report` to `output`, or to the timestamped default path.
    pub fn write(&self, report: &AggregateReport, output: Option<&Path>) -> Result<PathBuf> {
        let path = match output {
            Some(p) => p.to_path_buf(),
            None => self.default_path(Local::now()),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(report)?;
        fs::write(&path, content)?;
        Ok(path)
    }
}
