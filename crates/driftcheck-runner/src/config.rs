//! Harness and invoker configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use driftcheck_core::{ScriptCatalog, EXPECTED_FAILURE_CATEGORY};
use serde::{Deserialize, Serialize};

/// Per-invocation time bound.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Time bound for `<compiler> --version`.
pub const DEFAULT_VERSION_TIMEOUT_SECS: u64 = 5;

/// How the compiler's process contract is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokerConfig {
    /// Kill the compiler after this long.
    pub timeout: Duration,

    pub version_timeout: Duration,

    /// Substring on stdout that marks a failed compile even with exit 0.
    pub error_marker: String,

    /// Token stripped from the first marker line to form the message.
    pub marker_prefix: String,

    /// Appended to the script path to locate the artifact.
    pub artifact_suffix: String,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            version_timeout: Duration::from_secs(DEFAULT_VERSION_TIMEOUT_SECS),
            error_marker: "[ERROR]".to_string(),
            marker_prefix: " -> [ERROR] ".to_string(),
            artifact_suffix: "bc".to_string(),
        }
    }
}

/// Where the corpus lives and how a run behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub scripts_dir: PathBuf,
    pub baselines_dir: PathBuf,
    pub output_dir: PathBuf,
    pub reports_dir: PathBuf,

    /// Extension (without dot) of script files.
    pub script_extension: String,

    /// Category whose scripts must fail to compile.
    pub expected_failure_category: String,

    /// Restrict the run to one category directory.
    pub category: Option<String>,

    /// Rewrite baselines instead of comparing against them.
    pub update_baselines: bool,

    /// Concurrent evaluations. 1 keeps the run strictly sequential.
    pub jobs: usize,

    /// Stop issuing invocations after this long and report what finished.
    pub run_timeout: Option<Duration>,

    /// Persist the first invocation's result instead of compiling again for
    /// the baseline write.
    pub reuse_first_compile: bool,
}

impl HarnessConfig {
    /// Defaults rooted at `<root>/tests/{scripts,baselines,outputs,reports}`.
    pub fn from_project_root(root: &Path) -> Self {
        let tests = root.join("tests");
        Self {
            scripts_dir: tests.join("scripts"),
            baselines_dir: tests.join("baselines"),
            output_dir: tests.join("outputs"),
            reports_dir: tests.join("reports"),
            script_extension: "gs2".to_string(),
            expected_failure_category: EXPECTED_FAILURE_CATEGORY.to_string(),
            category: None,
            update_baselines: false,
            jobs: 1,
            run_timeout: None,
            reuse_first_compile: false,
        }
    }

    /// Create the directories the harness writes into.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.baselines_dir, &self.output_dir, &self.reports_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn catalog(&self) -> ScriptCatalog {
        ScriptCatalog::new(
            &self.scripts_dir,
            &self.script_extension,
            &self.expected_failure_category,
        )
    }
}
