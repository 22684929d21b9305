//! In-process compiler fake (testing only).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use driftcheck_core::{CompilerIdentity, InvocationResult};

use crate::compiler::Compiler;

/// Compiler returning scripted results per script path.
///
/// Each script has a queue of responses; the last one repeats once the queue
/// is drained. Unscripted paths fail with a fixed message.
#[derive(Debug)]
pub struct ScriptedCompiler {
    version: String,
    delay: Option<Duration>,
    responses: Mutex<HashMap<PathBuf, Vec<InvocationResult>>>,
    calls: Mutex<HashMap<PathBuf, usize>>,
}

impl ScriptedCompiler {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            delay: None,
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Sleep this long inside every `compile`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue responses for `script`, returned in order.
    pub fn respond(&self, script: impl Into<PathBuf>, results: Vec<InvocationResult>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(script.into(), results);
    }

    /// Number of `compile` calls made for `script`.
    pub fn calls(&self, script: &Path) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(script)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Compiler for ScriptedCompiler {
    async fn compile(&self, script: &Path) -> InvocationResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let n = {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            let n = calls.entry(script.to_path_buf()).or_insert(0);
            *n += 1;
            *n
        };

        let responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        match responses.get(script) {
            Some(queue) if !queue.is_empty() => queue[(n - 1).min(queue.len() - 1)].clone(),
            _ => InvocationResult::failed("no scripted response", Duration::ZERO),
        }
    }

    async fn identity(&self) -> CompilerIdentity {
        CompilerIdentity {
            path: PathBuf::from("scripted"),
            version: self.version.clone(),
        }
    }
}
