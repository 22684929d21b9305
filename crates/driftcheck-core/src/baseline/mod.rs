//! Baseline records and the store that owns them.

pub mod fs;
pub mod memory;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::BaselineError;
use crate::invocation::InvocationResult;
use crate::script::TestScript;

/// Timestamp format used for `generatedAt`.
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Provenance of a baseline record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineMetadata {
    pub script_path: String,
    pub generated_at: String,
    pub compiler_version: String,
}

/// The last accepted outcome for one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    /// Hex SHA-256 of the artifact, or `""` when there was no artifact.
    pub content_hash: String,
    pub artifact_size: u64,
    pub compilation_succeeded: bool,
    pub expected_failure: bool,
    #[serde(default)]
    pub error_message: String,
    pub metadata: BaselineMetadata,
}

impl Baseline {
    /// Build the record for `result`, stamped with the current local time.
    pub fn record(script: &TestScript, result: &InvocationResult, compiler_version: &str) -> Self {
        Self {
            content_hash: result.content_hash(),
            artifact_size: result.artifact_size(),
            compilation_succeeded: result.success,
            expected_failure: script.is_expected_failure(),
            error_message: result.message.clone(),
            metadata: BaselineMetadata {
                script_path: script.id(),
                generated_at: Local::now().format(GENERATED_AT_FORMAT).to_string(),
                compiler_version: compiler_version.to_string(),
            },
        }
    }
}

/// Whether a result may become a script's accepted baseline.
///
/// An unexpected failure never silently replaces or creates a baseline.
pub fn may_persist(script: &TestScript, result: &InvocationResult) -> bool {
    result.success || script.is_expected_failure()
}

/// Persistence for baselines, keyed by script identity.
///
/// `load` never fails: a missing or unreadable record is reported as absent
/// (with a warning for the unreadable case).
pub trait BaselineStore: Send + Sync {
    /// Load the baseline for `script`, if one is recorded and readable.
    fn load(&self, script: &TestScript) -> Option<Baseline>;

    /// Write `baseline`, plus the raw artifact when non-empty.
    fn put(&self, script: &TestScript, baseline: &Baseline, artifact: &[u8])
        -> Result<(), BaselineError>;

    /// Record `result` as the baseline for `script` and return what was written.
    ///
    /// Callers decide whether the result may be persisted (see [`may_persist`]).
    fn save(
        &self,
        script: &TestScript,
        result: &InvocationResult,
        compiler_version: &str,
    ) -> Result<Baseline, BaselineError> {
        let baseline = Baseline::record(script, result, compiler_version);
        self.put(script, &baseline, &result.artifact)?;
        Ok(baseline)
    }
}
