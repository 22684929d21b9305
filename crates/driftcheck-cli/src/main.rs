//! driftcheck - bytecode regression harness
//!
//! Compiles every script in the corpus with the external compiler, compares
//! each result against its recorded baseline and writes a JSON report.
//!
//! ## Exit codes
//!
//! - `0`: no regressions, no unexpected failures
//! - `1`: at least one regression
//! - `2`: no regressions, but some scripts failed unexpectedly
//! - `3`: the harness itself could not run

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

use driftcheck_core::{
    init_tracing, AggregateReport, Classification, ExitStatus, FsBaselineStore, ReportGenerator,
    ScriptOutcome,
};
use driftcheck_runner::config::DEFAULT_TIMEOUT_SECS;
use driftcheck_runner::{
    resolve_compiler, Compiler, HarnessConfig, InvokerConfig, ProcessCompiler, TestOrchestrator,
};

/// Characters of an expected failure's message shown on the console.
const EXPECTED_FAILURE_PREVIEW: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "driftcheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bytecode regression harness for the GS2 compiler", long_about = None)]
struct Cli {
    /// Only run scripts in this category directory
    #[arg(short, long, env = "DRIFTCHECK_CATEGORY")]
    category: Option<String>,

    /// Rewrite baselines from this run instead of comparing against them
    #[arg(long, env = "DRIFTCHECK_UPDATE_BASELINES")]
    update_baselines: bool,

    /// Project root holding the compiler build and the tests/ tree
    #[arg(long, env = "DRIFTCHECK_PROJECT_ROOT", default_value = ".")]
    project_root: PathBuf,

    /// Script corpus (default: <root>/tests/scripts)
    #[arg(long, env = "DRIFTCHECK_SCRIPTS_DIR")]
    scripts_dir: Option<PathBuf>,

    /// Baseline directory (default: <root>/tests/baselines)
    #[arg(long, env = "DRIFTCHECK_BASELINES_DIR")]
    baselines_dir: Option<PathBuf>,

    /// Scratch output directory (default: <root>/tests/outputs)
    #[arg(long, env = "DRIFTCHECK_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Report directory (default: <root>/tests/reports)
    #[arg(long, env = "DRIFTCHECK_REPORTS_DIR")]
    reports_dir: Option<PathBuf>,

    /// Write the report to this file instead of a timestamped one
    #[arg(short, long, env = "DRIFTCHECK_OUTPUT_REPORT")]
    output_report: Option<PathBuf>,

    /// Compiler executable (default: searched under the project root)
    #[arg(long, env = "DRIFTCHECK_COMPILER")]
    compiler: Option<PathBuf>,

    /// Per-script compile timeout in seconds
    #[arg(long, env = "DRIFTCHECK_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Scripts evaluated concurrently
    #[arg(short, long, env = "DRIFTCHECK_JOBS", default_value_t = 1)]
    jobs: usize,

    /// Stop starting new scripts after this many seconds
    #[arg(long, env = "DRIFTCHECK_RUN_TIMEOUT")]
    run_timeout: Option<u64>,

    /// Save the first compile as the baseline rather than compiling again
    #[arg(long, env = "DRIFTCHECK_REUSE_FIRST_COMPILE")]
    reuse_first_compile: bool,

    /// No console narration
    #[arg(short, long, env = "DRIFTCHECK_QUIET")]
    quiet: bool,

    /// List per-test compile times
    #[arg(long, env = "DRIFTCHECK_SHOW_TIMING")]
    show_timing: bool,

    /// Enable verbose output
    #[arg(short, long, env = "DRIFTCHECK_VERBOSE")]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, env = "DRIFTCHECK_JSON")]
    json: bool,
}

impl Cli {
    fn harness_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::from_project_root(&self.project_root);
        if let Some(dir) = &self.scripts_dir {
            config.scripts_dir = dir.clone();
        }
        if let Some(dir) = &self.baselines_dir {
            config.baselines_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.reports_dir {
            config.reports_dir = dir.clone();
        }
        config.category = self.category.clone();
        config.update_baselines = self.update_baselines;
        config.jobs = self.jobs.max(1);
        config.run_timeout = self.run_timeout.map(Duration::from_secs);
        config.reuse_first_compile = self.reuse_first_compile;
        config
    }

    fn invoker_config(&self) -> InvokerConfig {
        InvokerConfig {
            timeout: Duration::from_secs(self.timeout),
            ..InvokerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match run(cli).await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(ExitStatus::Fatal.code())
        }
    }
}

async fn run(cli: Cli) -> Result<ExitStatus> {
    let config = cli.harness_config();

    let compiler_path = resolve_compiler(&cli.project_root, cli.compiler.as_deref())?;
    config
        .ensure_dirs()
        .context("Failed to create harness directories")?;

    let compiler = Arc::new(ProcessCompiler::new(compiler_path, cli.invoker_config()));
    let identity = compiler.identity().await;
    info!(compiler = %identity.path.display(), version = %identity.version, "Using compiler");

    let store = Arc::new(FsBaselineStore::new(&config.baselines_dir));
    let generator =
        ReportGenerator::new(&config.reports_dir).with_project_root(&cli.project_root);
    let orchestrator = TestOrchestrator::new(compiler, store, config);

    let scripts = orchestrator.discover()?;
    let total = scripts.len();
    if !cli.quiet {
        println!("Running {total} tests...");
    }

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let quiet = cli.quiet;
    let summary = orchestrator
        .run_until(&identity, scripts, shutdown, |done, outcome| {
            if !quiet {
                print!("{}", render_outcome(done, total, outcome));
            }
        })
        .await;

    let report = generator.finalize(summary, &identity);
    let path = generator
        .write(&report, cli.output_report.as_deref())
        .context("Failed to write report")?;

    if !cli.quiet {
        print!("{}", render_summary(&report, &path, cli.show_timing));
    }
    Ok(report.exit_status())
}

/// Console lines for one finished script.
fn render_outcome(done: usize, total: usize, outcome: &ScriptOutcome) -> String {
    let mut out = format!("[{done}/{total}] Testing {}...\n", outcome.script.id());
    for line in outcome_lines(outcome) {
        out.push_str("  -> ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn outcome_lines(outcome: &ScriptOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(note) = outcome.baseline_action.note() {
        lines.push(note);
    }

    let regression = outcome.is_regression();
    if regression {
        lines.push(format!("REGRESSION: {}", join_differences(outcome)));
    }

    let message = outcome.result.message.trim_end();
    match outcome.classification {
        Classification::ExpectedFailure => {
            let preview: String = message.chars().take(EXPECTED_FAILURE_PREVIEW).collect();
            lines.push(format!("EXPECTED FAILURE: {preview}..."));
        }
        Classification::UnexpectedSuccess => {
            lines.push("UNEXPECTED SUCCESS: Expected failure but compiled successfully".into());
        }
        Classification::Pass if !regression => lines.push("PASS".into()),
        Classification::Fail if !regression => lines.push(format!("FAILED: {message}")),
        _ => {}
    }
    lines
}

fn join_differences(outcome: &ScriptOutcome) -> String {
    outcome
        .differences
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_summary(report: &AggregateReport, path: &Path, show_timing: bool) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", "=".repeat(60)));
    out.push_str("Test Summary:\n");
    out.push_str(&format!("  Total Tests: {}\n", s.total));
    out.push_str(&format!("  Passed: {}\n", s.passed));
    out.push_str(&format!("  Failed: {}\n", s.failed));
    out.push_str(&format!("  Expected Failures: {}\n", s.expected_failures));
    out.push_str(&format!("  Regressions: {}\n", report.regressions.len()));
    out.push_str(&format!("  New Tests: {}\n", report.new_tests.len()));
    out.push_str(&format!("  Execution Time: {:.2}s\n", report.execution_time));
    out.push_str(&format!("  Report saved to: {}\n", path.display()));
    if report.metadata.interrupted {
        out.push_str(&format!(
            "  Interrupted: {} of {} scripts completed\n",
            s.total, report.metadata.scripts_discovered
        ));
    }

    if show_timing {
        out.push_str("\nCompilation Timing (microseconds):\n");
        let mut total_us = 0u64;
        for test in &report.tests {
            let us = (test.compilation_time * 1_000_000.0) as u64;
            total_us += us;
            out.push_str(&format!(
                "  {} {}: {} μs\n",
                status_mark(test.success),
                test.script,
                group_thousands(us)
            ));
        }
        out.push_str(&format!(
            "  Total compilation time: {} μs\n",
            group_thousands(total_us)
        ));
    }

    if !report.new_tests.is_empty() {
        out.push_str("\nNew tests added:\n");
        for test in &report.new_tests {
            out.push_str(&format!("  {} {}\n", status_mark(test.success), test.script));
        }
    }

    if !report.regressions.is_empty() {
        out.push_str("\nRegressions detected:\n");
        for test in &report.regressions {
            let diffs = test
                .differences
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("  {}: {}\n", test.script, diffs));
        }
    }
    out
}

fn status_mark(success: bool) -> &'static str {
    if success {
        "✓"
    } else {
        "✗"
    }
}

/// `1234567` -> `1,234,567`
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
