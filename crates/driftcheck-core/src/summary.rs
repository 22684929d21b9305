//! Run-level aggregation of script outcomes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::outcome::{ScriptOutcome, TestRecord};

/// Process exit status of a harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Clean = 0,
    Regressions = 1,
    UnexpectedFailures = 2,
    Fatal = 3,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Summary counters. `passed + failed + expected_failures == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub expected_failures: usize,
}

impl SummaryCounts {
    fn tally(&mut self, classification: Classification) {
        self.total += 1;
        match classification {
            Classification::Pass => self.passed += 1,
            Classification::Fail | Classification::UnexpectedSuccess => self.failed += 1,
            Classification::ExpectedFailure => self.expected_failures += 1,
        }
    }
}

/// Aggregate of a run, reduced from [`ScriptOutcome`]s at one point.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub counts: SummaryCounts,
    pub tests: Vec<TestRecord>,
    pub regressions: Vec<TestRecord>,
    pub new_tests: Vec<TestRecord>,
    pub execution_time: Duration,
    /// Scripts enumerated for the run; exceeds `counts.total` when interrupted.
    pub discovered: usize,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn new(discovered: usize) -> Self {
        Self {
            discovered,
            ..Self::default()
        }
    }

    /// Fold one outcome into the summary.
    pub fn record(&mut self, outcome: &ScriptOutcome) {
        self.counts.tally(outcome.classification);

        let record = outcome.to_record();
        if outcome.is_regression() {
            self.regressions.push(record.clone());
        }
        if outcome.is_new_test() {
            self.new_tests.push(record.clone());
        }
        self.tests.push(record);
    }

    /// Seal the summary. Lists are ordered by script path so that completion
    /// order under concurrent evaluation does not leak into the report.
    pub fn finish(mut self, execution_time: Duration, interrupted: bool) -> Self {
        self.execution_time = execution_time;
        self.interrupted = interrupted;
        for list in [&mut self.tests, &mut self.regressions, &mut self.new_tests] {
            list.sort_by(|a, b| a.script.cmp(&b.script));
        }
        self
    }

    pub fn exit_status(&self) -> ExitStatus {
        exit_status_for(self.regressions.len(), self.counts.failed)
    }
}

/// Regressions dominate unexpected failures.
pub fn exit_status_for(regressions: usize, failed: usize) -> ExitStatus {
    if regressions > 0 {
        ExitStatus::Regressions
    } else if failed > 0 {
        ExitStatus::UnexpectedFailures
    } else {
        ExitStatus::Clean
    }
}
