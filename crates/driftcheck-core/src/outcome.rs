//! Per-script evaluation outcome and its serialized form.

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::diff::Difference;
use crate::invocation::InvocationResult;
use crate::script::TestScript;

/// What happened to a script's baseline during its evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineAction {
    /// Baseline existed and the fresh result was diffed against it.
    Compared,
    /// No baseline existed; one was written.
    Created,
    /// Update mode; the baseline was rewritten.
    Updated,
    /// No baseline existed and the script failed unexpectedly; nothing written.
    SkippedFailedCreation,
    /// Update mode and the script failed unexpectedly; the old record stands.
    KeptPrevious,
    /// The store could not write the record.
    SaveFailed { reason: String },
}

impl BaselineAction {
    /// Console note for actions that touch (or decline to touch) the store.
    pub fn note(&self) -> Option<String> {
        match self {
            BaselineAction::Compared => None,
            BaselineAction::Created => Some("Created new baseline".to_string()),
            BaselineAction::Updated => Some("Updated baseline".to_string()),
            BaselineAction::SkippedFailedCreation => {
                Some("Skipping baseline creation (test failed)".to_string())
            }
            BaselineAction::KeptPrevious => {
                Some("Keeping previous baseline (test failed)".to_string())
            }
            BaselineAction::SaveFailed { reason } => {
                Some(format!("Could not write baseline: {reason}"))
            }
        }
    }
}

/// Everything one evaluation produced for one script.
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub script: TestScript,
    pub result: InvocationResult,
    pub classification: Classification,
    pub had_baseline: bool,
    pub baseline_action: BaselineAction,
    pub differences: Vec<Difference>,
}

impl ScriptOutcome {
    pub fn is_regression(&self) -> bool {
        !self.differences.is_empty()
    }

    pub fn is_new_test(&self) -> bool {
        self.baseline_action == BaselineAction::Created
    }

    pub fn to_record(&self) -> TestRecord {
        TestRecord {
            script: self.script.id(),
            category: self.script.category.clone(),
            success: self.result.success,
            compilation_time: self.result.elapsed.as_secs_f64(),
            artifact_size: self.result.artifact_size(),
            content_hash: self.result.content_hash(),
            error_message: self.result.message.clone(),
            has_baseline: self.had_baseline,
            expected_failure: self.script.is_expected_failure(),
            classification: self.classification,
            baseline_action: self.baseline_action.clone(),
            is_regression: self.is_regression(),
            differences: self.differences.clone(),
        }
    }
}

/// One entry of the report's `tests`, `regressions` and `newTests` lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub script: String,
    pub category: String,
    pub success: bool,
    /// Seconds.
    pub compilation_time: f64,
    pub artifact_size: u64,
    pub content_hash: String,
    pub error_message: String,
    pub has_baseline: bool,
    pub expected_failure: bool,
    pub classification: Classification,
    pub baseline_action: BaselineAction,
    pub is_regression: bool,
    pub differences: Vec<Difference>,
}
