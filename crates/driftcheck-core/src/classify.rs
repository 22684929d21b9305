//! Classification of a script's result against its category.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::invocation::InvocationResult;
use crate::script::Expectation;

/// Verdict for one script. Exactly one per evaluated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Pass,
    Fail,
    ExpectedFailure,
    UnexpectedSuccess,
}

impl Classification {
    /// Classify a raw result given what the script's category expects.
    pub fn of(expectation: Expectation, result: &InvocationResult) -> Self {
        match (expectation, result.success) {
            (Expectation::MustFail, false) => Classification::ExpectedFailure,
            (Expectation::MustFail, true) => Classification::UnexpectedSuccess,
            (Expectation::MustCompile, true) => Classification::Pass,
            (Expectation::MustCompile, false) => Classification::Fail,
        }
    }

    /// Whether this verdict counts toward the `failed` counter.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Classification::Fail | Classification::UnexpectedSuccess
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Pass => "PASS",
            Classification::Fail => "FAILED",
            Classification::ExpectedFailure => "EXPECTED FAILURE",
            Classification::UnexpectedSuccess => "UNEXPECTED SUCCESS",
        };
        f.write_str(label)
    }
}
