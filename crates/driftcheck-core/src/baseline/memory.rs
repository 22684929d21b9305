//! In-memory baseline store (testing only).

use std::collections::HashMap;
use std::sync::Mutex;

use super::{Baseline, BaselineStore};
use crate::error::BaselineError;
use crate::script::TestScript;

/// Baseline store backed by a `HashMap<script id, (record, artifact)>`.
#[derive(Debug, Default)]
pub struct MemoryBaselineStore {
    records: Mutex<HashMap<String, (Baseline, Vec<u8>)>>,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a record, as if written by an earlier run.
    pub fn insert(&self, script_id: impl Into<String>, baseline: Baseline) {
        self.lock().insert(script_id.into(), (baseline, Vec::new()));
    }

    /// Raw artifact stored with the record, if any.
    pub fn artifact(&self, script_id: &str) -> Option<Vec<u8>> {
        self.lock()
            .get(script_id)
            .map(|(_, a)| a.clone())
            .filter(|a| !a.is_empty())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Baseline, Vec<u8>)>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn load(&self, script: &TestScript) -> Option<Baseline> {
        self.lock().get(&script.id()).map(|(b, _)| b.clone())
    }

    fn put(
        &self,
        script: &TestScript,
        baseline: &Baseline,
        artifact: &[u8],
    ) -> Result<(), BaselineError> {
        self.lock()
            .insert(script.id(), (baseline.clone(), artifact.to_vec()));
        Ok(())
    }
}
