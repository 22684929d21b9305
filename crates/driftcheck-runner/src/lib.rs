//! driftcheck runner
//!
//! Drives the external compiler over the script corpus:
//! - resolves and queries the compiler executable
//! - runs one compiler process per script with a time bound
//! - orchestrates classify / compare / baseline refresh per script
//! - bounded concurrency and cooperative cancellation of a run

pub mod compiler;
pub mod config;
pub mod fakes;
pub mod orchestrator;
pub mod runner;

// Re-export key types
pub use compiler::{compiler_candidates, query_version, resolve_compiler, Compiler};
pub use config::{HarnessConfig, InvokerConfig};
pub use fakes::ScriptedCompiler;
pub use orchestrator::TestOrchestrator;
pub use runner::{interpret_output, ProcessCompiler};
