//! Difference engine: fresh result vs. recorded baseline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::invocation::InvocationResult;

/// One discrepancy between a fresh result and its baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Difference {
    /// A script with no usable success status in its baseline failed.
    UnexpectedFailure { message: String },
    SuccessStatusChanged { old: bool, new: bool },
    HashChanged { old: String, new: String },
    SizeChanged { old: u64, new: u64 },
    ExpectedFailureNowSucceeds,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::UnexpectedFailure { message } => {
                write!(f, "Unexpected compilation failure: {message}")
            }
            Difference::SuccessStatusChanged { old, new } => {
                write!(f, "Compilation success changed: {old} -> {new}")
            }
            Difference::HashChanged { old, new } => {
                write!(f, "Bytecode hash changed: {old} -> {new}")
            }
            Difference::SizeChanged { old, new } => {
                write!(f, "Bytecode size changed: {old} -> {new}")
            }
            Difference::ExpectedFailureNowSucceeds => {
                f.write_str("Expected failure but compilation succeeded")
            }
        }
    }
}

/// Compare `result` against `baseline`.
///
/// Rules are applied in a fixed order and none short-circuits another:
/// 1. success status mismatch (silent when an expected-failure script still fails)
/// 2. hash and size, independently, when both sides compiled
/// 3. expected-failure script that now compiles (reported once)
///
/// Two failing runs are never compared by message.
pub fn compare(result: &InvocationResult, baseline: &Baseline) -> Vec<Difference> {
    let mut differences = Vec::new();

    if result.success != baseline.compilation_succeeded {
        if baseline.expected_failure {
            if result.success {
                differences.push(Difference::ExpectedFailureNowSucceeds);
            }
        } else {
            differences.push(Difference::SuccessStatusChanged {
                old: baseline.compilation_succeeded,
                new: result.success,
            });
        }
    }

    if result.success && baseline.compilation_succeeded {
        let hash = result.content_hash();
        if hash != baseline.content_hash {
            differences.push(Difference::HashChanged {
                old: baseline.content_hash.clone(),
                new: hash,
            });
        }

        let size = result.artifact_size();
        if size != baseline.artifact_size {
            differences.push(Difference::SizeChanged {
                old: baseline.artifact_size,
                new: size,
            });
        }
    }

    if baseline.expected_failure
        && result.success
        && !differences.contains(&Difference::ExpectedFailureNowSucceeds)
    {
        differences.push(Difference::ExpectedFailureNowSucceeds);
    }

    differences
}
