//! Outcome of one compiler invocation.

use std::time::Duration;

use crate::digest::content_hash;

/// Message recorded when the compiler exceeds its time bound.
pub const TIMEOUT_MESSAGE: &str = "Compilation timeout";

/// What a single compile of a single script produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Exit status zero, no error marker on stdout, and an artifact present.
    pub success: bool,

    /// Artifact bytes. Empty unless `success`.
    pub artifact: Vec<u8>,

    /// Diagnostic text (normalized error line on failure).
    pub message: String,

    /// Wall time of the invocation.
    pub elapsed: Duration,
}

impl InvocationResult {
    pub fn succeeded(artifact: Vec<u8>, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: true,
            artifact,
            message: message.into(),
            elapsed,
        }
    }

    pub fn failed(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            artifact: Vec::new(),
            message: message.into(),
            elapsed,
        }
    }

    pub fn timed_out(elapsed: Duration) -> Self {
        Self::failed(TIMEOUT_MESSAGE, elapsed)
    }

    /// `contentHash` of the artifact (empty string for no artifact).
    pub fn content_hash(&self) -> String {
        content_hash(&self.artifact)
    }

    pub fn artifact_size(&self) -> u64 {
        self.artifact.len() as u64
    }
}
