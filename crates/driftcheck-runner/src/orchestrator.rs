//! Run orchestration: invoke, classify, update or compare, tally.

use std::future::{self, Future};
use std::sync::Arc;
use std::time::Instant;

use driftcheck_core::obs;
use driftcheck_core::{
    compare, may_persist, BaselineAction, BaselineStore, Classification, CompilerIdentity,
    InvocationResult, Result, RunSummary, ScriptOutcome, TestScript,
};
use futures::stream::{self, StreamExt};
use tracing::{info, Instrument};

use crate::compiler::Compiler;
use crate::config::HarnessConfig;

/// Drives a run over the corpus.
///
/// Each script goes through `Invoke -> Classify -> (UpdateBaseline | Compare)`
/// independently; outcomes are folded into a [`RunSummary`] in one place.
pub struct TestOrchestrator {
    compiler: Arc<dyn Compiler>,
    store: Arc<dyn BaselineStore>,
    config: HarnessConfig,
}

impl TestOrchestrator {
    pub fn new(
        compiler: Arc<dyn Compiler>,
        store: Arc<dyn BaselineStore>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            compiler,
            store,
            config,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Enumerate the scripts for this run. Missing category or an empty
    /// corpus is fatal.
    pub fn discover(&self) -> Result<Vec<TestScript>> {
        self.config
            .catalog()
            .discover(self.config.category.as_deref())
    }

    /// Evaluate every script to completion.
    pub async fn run(&self, identity: &CompilerIdentity, scripts: Vec<TestScript>) -> RunSummary {
        self.run_until(identity, scripts, future::pending(), |_, _| {})
            .await
    }

    /// Evaluate scripts until done, `shutdown` resolves, or the configured
    /// run timeout elapses.
    ///
    /// On shutdown or timeout no further invocations start, in-flight ones
    /// are dropped (killing their child processes) and the summary holds the
    /// scripts completed so far. `observe` sees each outcome as it is folded
    /// in, along with the number completed.
    pub async fn run_until<F, O>(
        &self,
        identity: &CompilerIdentity,
        scripts: Vec<TestScript>,
        shutdown: F,
        observe: O,
    ) -> RunSummary
    where
        F: Future<Output = ()>,
        O: FnMut(usize, &ScriptOutcome),
    {
        let span = obs::run_span(&identity.version);
        self.drive(&identity.version, scripts, shutdown, observe)
            .instrument(span)
            .await
    }

    async fn drive<F, O>(
        &self,
        version: &str,
        scripts: Vec<TestScript>,
        shutdown: F,
        mut observe: O,
    ) -> RunSummary
    where
        F: Future<Output = ()>,
        O: FnMut(usize, &ScriptOutcome),
    {
        let start = Instant::now();
        let jobs = self.config.jobs.max(1);
        obs::emit_run_started(scripts.len(), self.config.update_baselines, jobs);

        let mut summary = RunSummary::new(scripts.len());

        let deadline = async {
            match self.config.run_timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        let mut outcomes = stream::iter(scripts)
            .map(|script| self.evaluate(script, version))
            .buffer_unordered(jobs);

        let mut interrupted = false;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    interrupted = true;
                    break;
                }
                _ = &mut deadline => {
                    info!("Run timeout reached");
                    interrupted = true;
                    break;
                }
                next = outcomes.next() => match next {
                    Some(outcome) => {
                        summary.record(&outcome);
                        observe(summary.counts.total, &outcome);
                    }
                    None => break,
                },
            }
        }
        drop(outcomes);

        if interrupted {
            obs::emit_run_interrupted(summary.counts.total, summary.discovered);
        }

        let summary = summary.finish(start.elapsed(), interrupted);
        obs::emit_run_finished(
            summary.counts.total,
            summary.regressions.len(),
            summary.counts.failed,
            summary.execution_time.as_millis() as u64,
        );
        summary
    }

    /// Full lifecycle of one script.
    pub async fn evaluate(&self, script: TestScript, compiler_version: &str) -> ScriptOutcome {
        let result = self.compiler.compile(&script.path).await;
        let classification = Classification::of(script.expectation, &result);
        let existing = self.store.load(&script);
        let had_baseline = existing.is_some();

        let (baseline_action, differences) = match existing {
            Some(baseline) if !self.config.update_baselines => {
                let differences = compare(&result, &baseline);
                if !differences.is_empty() {
                    obs::emit_regression(&script.id(), &differences);
                }
                (BaselineAction::Compared, differences)
            }
            _ => {
                let action = self
                    .refresh_baseline(&script, &result, had_baseline, compiler_version)
                    .await;
                (action, Vec::new())
            }
        };

        obs::emit_script_evaluated(
            &script.id(),
            classification,
            result.elapsed.as_millis() as u64,
        );

        ScriptOutcome {
            script,
            result,
            classification,
            had_baseline,
            baseline_action,
            differences,
        }
    }

    /// Write a baseline for `script` when the write guard allows it.
    ///
    /// By default the script is compiled again and that second result is what
    /// gets persisted; `reuse_first_compile` persists `first` instead.
    async fn refresh_baseline(
        &self,
        script: &TestScript,
        first: &InvocationResult,
        had_baseline: bool,
        compiler_version: &str,
    ) -> BaselineAction {
        let fresh;
        let candidate = if self.config.reuse_first_compile {
            first
        } else {
            fresh = self.compiler.compile(&script.path).await;
            &fresh
        };

        let id = script.id();
        if !may_persist(script, candidate) {
            obs::emit_baseline_skipped(&id);
            return if had_baseline {
                BaselineAction::KeptPrevious
            } else {
                BaselineAction::SkippedFailedCreation
            };
        }

        match self.store.save(script, candidate, compiler_version) {
            Ok(baseline) => {
                obs::emit_baseline_written(&id, !had_baseline, &baseline.content_hash);
                if had_baseline {
                    BaselineAction::Updated
                } else {
                    BaselineAction::Created
                }
            }
            Err(e) => {
                obs::emit_baseline_write_failed(&id, &e);
                BaselineAction::SaveFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
