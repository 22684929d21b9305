//! driftcheck core library
//!
//! Data model and pure logic of the bytecode regression harness:
//! - script discovery and category expectations
//! - result classification
//! - baseline persistence (`BaselineStore`, filesystem and in-memory)
//! - the difference engine
//! - run aggregation and report generation

pub mod baseline;
pub mod classify;
pub mod diff;
pub mod digest;
pub mod error;
pub mod invocation;
pub mod obs;
pub mod outcome;
pub mod report;
pub mod script;
pub mod summary;
pub mod telemetry;

pub use baseline::fs::FsBaselineStore;
pub use baseline::memory::MemoryBaselineStore;
pub use baseline::{may_persist, Baseline, BaselineMetadata, BaselineStore};
pub use classify::Classification;
pub use diff::{compare, Difference};
pub use digest::{content_hash, Digest};
pub use error::{BaselineError, HarnessError, Result};
pub use invocation::{InvocationResult, TIMEOUT_MESSAGE};
pub use outcome::{BaselineAction, ScriptOutcome, TestRecord};
pub use report::{AggregateReport, CompilerIdentity, ReportGenerator, ReportMetadata};
pub use script::{Expectation, ScriptCatalog, TestScript, EXPECTED_FAILURE_CATEGORY};
pub use summary::{ExitStatus, RunSummary, SummaryCounts};
pub use telemetry::init_tracing;
