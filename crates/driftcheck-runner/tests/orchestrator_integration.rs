//! End-to-end runs against a real child process and on-disk baselines.
//!
//! The "compiler" here is `/bin/sh`: every corpus script is a small shell
//! program that acts out the compiler's side of the contract for itself
//! (`$0` is the script path, so the artifact goes to `${0}bc`).

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use driftcheck_core::{
    BaselineAction, BaselineStore, Classification, Difference, ExitStatus, FsBaselineStore,
    ReportGenerator, TestScript, TIMEOUT_MESSAGE,
};
use driftcheck_runner::{Compiler, HarnessConfig, InvokerConfig, ProcessCompiler, TestOrchestrator};
use tempfile::TempDir;

const SH: &str = "/bin/sh";

const EMIT_A: &str = "printf 'BYTECODE-A' > \"${0}bc\"\necho compiled\n";
const EMIT_B: &str = "printf 'BYTECODE-BB' > \"${0}bc\"\necho compiled\n";
const MARKER: &str = "echo \"parsing $0\"\necho \" -> [ERROR] unexpected token at line 1\"\n";
const CRASH: &str = "echo boom >&2\nexit 1\n";
const NO_ARTIFACT: &str = "echo done\n";
const HANG: &str = "sleep 5\n";

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self) -> HarnessConfig {
        let config = HarnessConfig::from_project_root(self.root());
        config.ensure_dirs().unwrap();
        config
    }

    fn script(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.config().scripts_dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    fn store(&self) -> FsBaselineStore {
        FsBaselineStore::new(self.config().baselines_dir)
    }

    fn orchestrator(&self, config: HarnessConfig) -> TestOrchestrator {
        let compiler = Arc::new(ProcessCompiler::new(SH, InvokerConfig::default()));
        TestOrchestrator::new(compiler, Arc::new(self.store()), config)
    }

    fn test_script(&self, rel: &str) -> TestScript {
        let config = self.config();
        TestScript::new(
            &config.scripts_dir,
            config.scripts_dir.join(rel),
            &config.expected_failure_category,
        )
    }
}

async fn run(project: &Project, config: HarnessConfig) -> driftcheck_core::RunSummary {
    let orchestrator = project.orchestrator(config);
    let scripts = orchestrator.discover().unwrap();
    let identity = ProcessCompiler::new(SH, InvokerConfig::default())
        .identity()
        .await;
    orchestrator.run(&identity, scripts).await
}

#[tokio::test]
async fn first_run_records_baselines_and_second_run_is_clean() {
    let project = Project::new();
    project.script("core/fn_basic.gs2", EMIT_A);
    project.script("error_cases/bad_syntax.gs2", MARKER);

    let first = run(&project, project.config()).await;
    assert_eq!(first.counts.total, 2);
    assert_eq!(first.counts.passed, 1);
    assert_eq!(first.counts.expected_failures, 1);
    assert_eq!(first.new_tests.len(), 2);

    let store = project.store();
    let ok = project.test_script("core/fn_basic.gs2");
    assert!(store.record_path(&ok).ends_with("core/fn_basic.json"));
    assert_eq!(fs::read(store.artifact_path(&ok)).unwrap(), b"BYTECODE-A");
    let bad = project.test_script("error_cases/bad_syntax.gs2");
    assert!(store.record_path(&bad).is_file());
    assert!(!store.artifact_path(&bad).exists());
    assert_eq!(
        store.load(&bad).unwrap().error_message,
        "unexpected token at line 1"
    );

    // The compiler's artifact does not linger next to the script.
    assert!(!ok.path.with_extension("gs2bc").exists());

    let second = run(&project, project.config()).await;
    assert!(second.regressions.is_empty());
    assert!(second.new_tests.is_empty());
    assert_eq!(second.exit_status(), ExitStatus::Clean);
}

#[tokio::test]
async fn changed_bytecode_is_reported_and_written_to_report() {
    let project = Project::new();
    let path = project.script("core/fn_basic.gs2", EMIT_A);
    run(&project, project.config()).await;

    fs::write(&path, EMIT_B).unwrap();
    let summary = run(&project, project.config()).await;

    assert_eq!(summary.exit_status(), ExitStatus::Regressions);
    let differences = &summary.regressions[0].differences;
    assert!(matches!(differences[0], Difference::HashChanged { .. }));
    assert_eq!(differences[1], Difference::SizeChanged { old: 10, new: 11 });

    let config = project.config();
    let generator = ReportGenerator::new(&config.reports_dir).with_project_root(project.root());
    let identity = driftcheck_core::CompilerIdentity {
        path: PathBuf::from(SH),
        version: "sh".to_string(),
    };
    let report = generator.finalize(summary, &identity);
    let written = generator.write(&report, None).unwrap();
    assert!(written.starts_with(&config.reports_dir));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(written).unwrap()).unwrap();
    assert_eq!(json["summary"]["total"], 1);
    assert_eq!(json["regressions"][0]["script"], "core/fn_basic.gs2");
    assert_eq!(json["regressions"][0]["isRegression"], true);
    assert!(json["newTests"].as_array().unwrap().is_empty());
    assert_eq!(json["metadata"]["compilerPath"], SH);
}

#[tokio::test]
async fn update_mode_accepts_new_bytecode() {
    let project = Project::new();
    let path = project.script("core/fn_basic.gs2", EMIT_A);
    run(&project, project.config()).await;
    fs::write(&path, EMIT_B).unwrap();

    let mut config = project.config();
    config.update_baselines = true;
    let updated = run(&project, config).await;
    assert!(updated.regressions.is_empty());
    assert_eq!(updated.tests[0].baseline_action, BaselineAction::Updated);

    let after = run(&project, project.config()).await;
    assert_eq!(after.exit_status(), ExitStatus::Clean);
}

#[tokio::test]
async fn update_mode_does_not_overwrite_with_failure() {
    let project = Project::new();
    let path = project.script("core/fn_basic.gs2", EMIT_A);
    run(&project, project.config()).await;
    fs::write(&path, CRASH).unwrap();

    let mut config = project.config();
    config.update_baselines = true;
    let summary = run(&project, config).await;

    assert_eq!(summary.tests[0].baseline_action, BaselineAction::KeptPrevious);
    let kept = project.store().load(&project.test_script("core/fn_basic.gs2")).unwrap();
    assert!(kept.compilation_succeeded);
    assert_eq!(kept.artifact_size, 10);
}

#[tokio::test]
async fn failing_new_script_leaves_no_baseline() {
    let project = Project::new();
    project.script("core/broken.gs2", CRASH);

    let summary = run(&project, project.config()).await;

    assert_eq!(summary.counts.failed, 1);
    assert_eq!(summary.tests[0].error_message, "boom\n");
    assert_eq!(summary.exit_status(), ExitStatus::UnexpectedFailures);
    assert!(!project
        .store()
        .record_path(&project.test_script("core/broken.gs2"))
        .exists());
}

#[tokio::test]
async fn marker_on_stdout_fails_despite_zero_exit() {
    let project = Project::new();
    let path = project.script("core/marked.gs2", MARKER);
    let compiler = ProcessCompiler::new(SH, InvokerConfig::default());

    let result = compiler.compile(&path).await;

    assert!(!result.success);
    assert_eq!(result.message, "unexpected token at line 1");
    assert!(result.artifact.is_empty());
}

#[tokio::test]
async fn success_without_artifact_is_failure() {
    let project = Project::new();
    let path = project.script("core/silent.gs2", NO_ARTIFACT);
    let compiler = ProcessCompiler::new(SH, InvokerConfig::default());

    let result = compiler.compile(&path).await;

    assert!(!result.success);
    assert!(result.message.contains("no output artifact"));
}

#[tokio::test]
async fn stale_artifact_is_not_picked_up() {
    let project = Project::new();
    let path = project.script("core/silent.gs2", NO_ARTIFACT);
    let mut stale = path.clone().into_os_string();
    stale.push("bc");
    fs::write(&stale, b"left over").unwrap();
    let compiler = ProcessCompiler::new(SH, InvokerConfig::default());

    let result = compiler.compile(&path).await;

    assert!(!result.success);
    assert!(!Path::new(&stale).exists());
}

#[tokio::test]
async fn hung_compiler_is_killed_at_timeout() {
    let project = Project::new();
    let path = project.script("core/hang.gs2", HANG);
    let config = InvokerConfig {
        timeout: Duration::from_millis(200),
        ..InvokerConfig::default()
    };
    let compiler = ProcessCompiler::new(SH, config);

    let started = std::time::Instant::now();
    let result = compiler.compile(&path).await;

    assert!(!result.success);
    assert_eq!(result.message, TIMEOUT_MESSAGE);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn repeated_compiles_hash_identically() {
    let project = Project::new();
    let path = project.script("core/fn_basic.gs2", EMIT_A);
    let compiler = ProcessCompiler::new(SH, InvokerConfig::default());

    let a = compiler.compile(&path).await;
    let b = compiler.compile(&path).await;

    assert!(a.success && b.success);
    assert_eq!(a.content_hash(), b.content_hash());
    assert_eq!(a.artifact_size(), 10);
}

#[tokio::test]
async fn corrupt_baseline_is_treated_as_missing() {
    let project = Project::new();
    project.script("core/fn_basic.gs2", EMIT_A);
    let record = project
        .store()
        .record_path(&project.test_script("core/fn_basic.gs2"));
    fs::create_dir_all(record.parent().unwrap()).unwrap();
    fs::write(&record, "{ not json").unwrap();

    let summary = run(&project, project.config()).await;

    assert!(summary.regressions.is_empty());
    assert_eq!(summary.tests[0].baseline_action, BaselineAction::Created);
    assert_eq!(summary.tests[0].classification, Classification::Pass);
}

#[tokio::test]
async fn category_filter_and_parallel_jobs() {
    let project = Project::new();
    for i in 0..6 {
        project.script(&format!("core/s{i}.gs2"), EMIT_A);
    }
    project.script("strings/other.gs2", EMIT_B);

    let mut config = project.config();
    config.category = Some("core".to_string());
    config.jobs = 3;
    let summary = run(&project, config).await;

    assert_eq!(summary.counts.total, 6);
    let names: Vec<_> = summary.tests.iter().map(|t| t.script.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.iter().all(|n| n.starts_with("core/")));
}
