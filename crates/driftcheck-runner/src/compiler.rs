//! The compiler seam: trait, executable resolution and version probing.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use driftcheck_core::{CompilerIdentity, HarnessError, InvocationResult};
use tokio::process::Command;
use tracing::debug;

/// Executable name looked up under the project root.
pub const DEFAULT_COMPILER_NAME: &str = "gs2test";

/// Something that can compile one script.
///
/// Implementations never fail: every problem is folded into the returned
/// [`InvocationResult`].
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, script: &Path) -> InvocationResult;

    /// Path and version recorded in baselines and reports.
    async fn identity(&self) -> CompilerIdentity;
}

/// Locations searched, in order, when no compiler path is given.
pub fn compiler_candidates(project_root: &Path) -> Vec<PathBuf> {
    vec![
        project_root.join("bin").join(DEFAULT_COMPILER_NAME),
        project_root.join("build").join(DEFAULT_COMPILER_NAME),
        project_root.join("build").join("Debug").join(DEFAULT_COMPILER_NAME),
        project_root.join("build").join("Release").join(DEFAULT_COMPILER_NAME),
    ]
}

/// Resolve the compiler executable. Failing to find one is fatal.
pub fn resolve_compiler(
    project_root: &Path,
    explicit: Option<&Path>,
) -> Result<PathBuf, HarnessError> {
    let searched = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => compiler_candidates(project_root),
    };

    if let Some(found) = searched.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }
    Err(HarnessError::CompilerNotFound { searched })
}

/// Ask the compiler for its version, falling back to its modification time.
///
/// `<compiler> --version` must exit 0 within `timeout`; otherwise the result
/// is `modified_<unix seconds>`.
pub async fn query_version(compiler: &Path, timeout: Duration) -> String {
    let run = Command::new(compiler)
        .arg("--version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(output)) if output.status.success() => {
            return String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
        Ok(Ok(output)) => debug!(status = ?output.status, "--version not supported"),
        Ok(Err(e)) => debug!(error = %e, "--version could not run"),
        Err(_) => debug!("--version timed out"),
    }

    modified_fallback(compiler)
}

fn modified_fallback(compiler: &Path) -> String {
    std::fs::metadata(compiler)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| format!("modified_{}", d.as_secs()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn candidates_in_search_order() {
        let c = compiler_candidates(Path::new("/proj"));
        assert_eq!(c[0], PathBuf::from("/proj/bin/gs2test"));
        assert_eq!(c[3], PathBuf::from("/proj/build/Release/gs2test"));
    }

    #[test]
    fn resolve_picks_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let release = dir.path().join("build/Release/gs2test");
        let debug = dir.path().join("build/Debug/gs2test");
        for p in [&release, &debug] {
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, "").unwrap();
        }
        assert_eq!(resolve_compiler(dir.path(), None).unwrap(), debug);
    }

    #[test]
    fn resolve_missing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        match resolve_compiler(dir.path(), None) {
            Err(HarnessError::CompilerNotFound { searched }) => assert_eq!(searched.len(), 4),
            other => panic!("expected CompilerNotFound, got {other:?}"),
        }
    }

    #[test]
    fn resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("mycc");
        assert!(resolve_compiler(dir.path(), Some(&custom)).is_err());
        fs::write(&custom, "").unwrap();
        assert_eq!(resolve_compiler(dir.path(), Some(&custom)).unwrap(), custom);
    }

    #[cfg(unix)]
    fn fake_compiler(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(DEFAULT_COMPILER_NAME);
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn version_is_trimmed_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = fake_compiler(dir.path(), "echo 'gs2test 9.9'\n");
        let version = query_version(&compiler, Duration::from_secs(5)).await;
        assert_eq!(version, "gs2test 9.9");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn version_nonzero_exit_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = fake_compiler(dir.path(), "echo 'usage: gs2test <script>'\nexit 1\n");
        let version = query_version(&compiler, Duration::from_secs(5)).await;
        assert!(version.starts_with("modified_"), "got {version}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_version_query_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = fake_compiler(dir.path(), "sleep 5\necho 'gs2test 9.9'\n");

        let started = std::time::Instant::now();
        let version = query_version(&compiler, Duration::from_millis(200)).await;

        assert!(version.starts_with("modified_"), "got {version}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn version_falls_back_to_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let not_executable = dir.path().join("gs2test");
        fs::write(&not_executable, "").unwrap();
        let version = query_version(&not_executable, Duration::from_secs(5)).await;
        assert!(version.starts_with("modified_"), "got {version}");
    }
}
