//! Error taxonomy for driftcheck.
//!
//! Only bootstrap-level conditions surface as [`HarnessError`]. Everything
//! that can go wrong while evaluating a single script is converted to data
//! (an `InvocationResult` message, an absent baseline, a `SaveFailed` action).

use std::path::PathBuf;

/// Errors that abort a whole run before any report is produced.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("could not find compiler executable (searched: {})", display_paths(.searched))]
    CompilerNotFound { searched: Vec<PathBuf> },

    #[error("scripts directory does not exist: {0}")]
    ScriptsRootMissing(PathBuf),

    #[error("category '{0}' does not exist")]
    CategoryNotFound(String),

    #[error("no test scripts found under {0}")]
    NoScripts(PathBuf),

    #[error("failed to walk scripts directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from baseline persistence.
#[derive(Debug, thiserror::Error)]
pub enum BaselineError {
    #[error("failed to encode baseline for {script}: {source}")]
    Encode {
        script: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for harness-level operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiler_not_found_lists_candidates() {
        let err = HarnessError::CompilerNotFound {
            searched: vec![PathBuf::from("bin/gs2test"), PathBuf::from("build/gs2test")],
        };
        let msg = err.to_string();
        assert!(msg.contains("could not find compiler"));
        assert!(msg.contains("bin/gs2test, build/gs2test"));
    }

    #[test]
    fn category_not_found_display() {
        let err = HarnessError::CategoryNotFound("loops".to_string());
        assert_eq!(err.to_string(), "category 'loops' does not exist");
    }
}
