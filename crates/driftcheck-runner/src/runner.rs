//! Compiler process execution and artifact handoff.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use driftcheck_core::{CompilerIdentity, InvocationResult};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::compiler::{query_version, Compiler};
use crate::config::InvokerConfig;

/// Success verdict and message read off the compiler's output streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputVerdict {
    pub success: bool,
    pub message: String,
}

/// Decide success from exit status and stdout, and pick the message.
///
/// Exit status zero is necessary but not sufficient: some compiler builds
/// print the error marker and still exit 0. The message is the first marker
/// line with the prefix token removed, else stdout, else stderr.
pub fn interpret_output(
    exit_ok: bool,
    stdout: &str,
    stderr: &str,
    config: &InvokerConfig,
) -> OutputVerdict {
    let marker_line = stdout
        .lines()
        .find(|line| line.contains(config.error_marker.as_str()));

    let message = match marker_line {
        Some(line) => line.replace(config.marker_prefix.as_str(), ""),
        None if !stdout.is_empty() => stdout.to_string(),
        None => stderr.to_string(),
    };

    OutputVerdict {
        success: exit_ok && marker_line.is_none(),
        message,
    }
}

/// `<script>` + suffix, in the script's directory.
pub fn artifact_path(script: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(script.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Runs the external compiler as a child process.
pub struct ProcessCompiler {
    path: PathBuf,
    config: InvokerConfig,
    version: OnceCell<String>,
}

impl ProcessCompiler {
    pub fn new(path: impl Into<PathBuf>, config: InvokerConfig) -> Self {
        Self {
            path: path.into(),
            config,
            version: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }
}

#[async_trait]
impl Compiler for ProcessCompiler {
    async fn compile(&self, script: &Path) -> InvocationResult {
        let artifact = artifact_path(script, &self.config.artifact_suffix);

        // A leftover from an earlier run must not pass for this run's output.
        if tokio::fs::remove_file(&artifact).await.is_ok() {
            debug!(path = %artifact.display(), "Removed stale artifact");
        }

        let start = Instant::now();
        let child = match Command::new(&self.path)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return InvocationResult::failed(e.to_string(), start.elapsed()),
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return InvocationResult::failed(e.to_string(), start.elapsed()),
            Err(_) => {
                warn!(
                    script = %script.display(),
                    timeout_secs = self.config.timeout.as_secs(),
                    "Compiler timed out and was killed"
                );
                return InvocationResult::timed_out(start.elapsed());
            }
        };
        let elapsed = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let verdict = interpret_output(output.status.success(), &stdout, &stderr, &self.config);
        if !verdict.success {
            return InvocationResult::failed(verdict.message, elapsed);
        }

        match tokio::fs::read(&artifact).await {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::remove_file(&artifact).await {
                    warn!(path = %artifact.display(), error = %e, "Could not remove artifact");
                }
                InvocationResult::succeeded(bytes, verdict.message, elapsed)
            }
            Err(_) => InvocationResult::failed(
                format!(
                    "reported success but no output artifact found at {}",
                    artifact.display()
                ),
                elapsed,
            ),
        }
    }

    async fn identity(&self) -> CompilerIdentity {
        let version = self
            .version
            .get_or_init(|| query_version(&self.path, self.config.version_timeout))
            .await
            .clone();
        CompilerIdentity {
            path: self.path.clone(),
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> InvokerConfig {
        InvokerConfig::default()
    }

    #[test]
    fn clean_exit_is_success() {
        let v = interpret_output(true, "compiled 3 functions\n", "", &config());
        assert!(v.success);
        assert_eq!(v.message, "compiled 3 functions\n");
    }

    #[test]
    fn marker_with_zero_exit_is_failure() {
        let stdout = "parsing bad_syntax.gs2\n -> [ERROR] unexpected token '}' at line 3\n -> [ERROR] other\n";
        let v = interpret_output(true, stdout, "", &config());
        assert!(!v.success);
        assert_eq!(v.message, "unexpected token '}' at line 3");
    }

    #[test]
    fn nonzero_exit_falls_back_to_stdout_then_stderr() {
        let v = interpret_output(false, "partial output", "segfault", &config());
        assert!(!v.success);
        assert_eq!(v.message, "partial output");

        let v = interpret_output(false, "", "segfault", &config());
        assert_eq!(v.message, "segfault");

        let v = interpret_output(false, "", "", &config());
        assert_eq!(v.message, "");
    }

    #[test]
    fn custom_marker() {
        let config = InvokerConfig {
            error_marker: "error:".to_string(),
            marker_prefix: "error: ".to_string(),
            ..InvokerConfig::default()
        };
        let v = interpret_output(true, "error: missing semicolon", "", &config);
        assert!(!v.success);
        assert_eq!(v.message, "missing semicolon");
    }

    #[test]
    fn artifact_path_appends_suffix() {
        assert_eq!(
            artifact_path(Path::new("/s/core/fn_basic.gs2"), "bc"),
            PathBuf::from("/s/core/fn_basic.gs2bc")
        );
    }

    #[tokio::test]
    async fn missing_binary_is_per_script_failure() {
        let compiler = ProcessCompiler::new("/nonexistent/gs2test", config());
        let result = compiler.compile(Path::new("/tmp/whatever.gs2")).await;
        assert!(!result.success);
        assert!(!result.message.is_empty());
        assert!(result.artifact.is_empty());
    }
}
