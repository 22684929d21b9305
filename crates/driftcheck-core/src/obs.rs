//! Structured observability hooks for the harness run lifecycle.
//!
//! Events are emitted at `info!` (warnings at `warn!`) with a stable
//! `event` field so JSON log consumers can filter on it.

use tracing::{info, warn};

use crate::classify::Classification;
use crate::diff::Difference;

/// Span covering one harness run. Attach with `Instrument::instrument` so
/// it follows the run future across awaits.
pub fn run_span(compiler_version: &str) -> tracing::Span {
    tracing::info_span!("driftcheck.run", compiler_version = %compiler_version)
}

pub fn emit_run_started(scripts: usize, update_baselines: bool, jobs: usize) {
    info!(
        event = "run.started",
        scripts = scripts,
        update_baselines = update_baselines,
        jobs = jobs,
    );
}

pub fn emit_script_evaluated(script: &str, classification: Classification, elapsed_ms: u64) {
    info!(
        event = "script.evaluated",
        script = %script,
        classification = %classification,
        elapsed_ms = elapsed_ms,
    );
}

pub fn emit_baseline_written(script: &str, created: bool, content_hash: &str) {
    info!(
        event = "baseline.written",
        script = %script,
        created = created,
        content_hash = %content_hash,
    );
}

pub fn emit_baseline_skipped(script: &str) {
    info!(event = "baseline.skipped", script = %script);
}

pub fn emit_baseline_write_failed(script: &str, error: &dyn std::fmt::Display) {
    warn!(event = "baseline.write_failed", script = %script, error = %error);
}

pub fn emit_regression(script: &str, differences: &[Difference]) {
    let detail = differences
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    warn!(event = "regression.detected", script = %script, differences = %detail);
}

pub fn emit_run_finished(total: usize, regressions: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "run.finished",
        total = total,
        regressions = regressions,
        failed = failed,
        duration_ms = duration_ms,
    );
}

pub fn emit_run_interrupted(completed: usize, discovered: usize) {
    warn!(
        event = "run.interrupted",
        completed = completed,
        discovered = discovered,
    );
}
