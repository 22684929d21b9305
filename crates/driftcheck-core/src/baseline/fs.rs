use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::warn;

use super::{Baseline, BaselineStore};
use crate::digest::Digest;
use crate::error::BaselineError;
use crate::script::TestScript;

/// Extension of baseline records.
pub const RECORD_EXTENSION: &str = "json";

/// Extension of the raw artifact kept next to a record.
pub const ARTIFACT_EXTENSION: &str = "bytecode";

/// Filesystem-backed baseline store mirroring the scripts tree.
///
/// Layout: `<root>/<relative script path, extension replaced by .json>`, with
/// the artifact at the same stem plus `.bytecode`. Only files carrying the
/// corpus script extension are ever enumerated, so replacing the extension
/// cannot map two scripts onto one record.
pub struct FsBaselineStore {
    root: PathBuf,
}

impl FsBaselineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the record for `script`.
    pub fn record_path(&self, script: &TestScript) -> PathBuf {
        self.root
            .join(&script.relative)
            .with_extension(RECORD_EXTENSION)
    }

    /// Location of the raw artifact copy for `script`.
    pub fn artifact_path(&self, script: &TestScript) -> PathBuf {
        self.record_path(script).with_extension(ARTIFACT_EXTENSION)
    }
}

impl BaselineStore for FsBaselineStore {
    fn load(&self, script: &TestScript) -> Option<Baseline> {
        let path = self.record_path(script);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(script = %script.id(), path = %path.display(), error = %e, "Could not read baseline");
                return None;
            }
        };

        let baseline: Baseline = match serde_json::from_str(&content) {
            Ok(b) => b,
            Err(e) => {
                warn!(script = %script.id(), path = %path.display(), error = %e, "Could not load baseline");
                return None;
            }
        };

        if !baseline.content_hash.is_empty() && baseline.content_hash.parse::<Digest>().is_err() {
            warn!(
                script = %script.id(),
                path = %path.display(),
                content_hash = %baseline.content_hash,
                "Baseline has a malformed content hash"
            );
            return None;
        }

        Some(baseline)
    }

    fn put(
        &self,
        script: &TestScript,
        baseline: &Baseline,
        artifact: &[u8],
    ) -> Result<(), BaselineError> {
        let record = serde_json::to_vec_pretty(baseline).map_err(|source| BaselineError::Encode {
            script: script.id(),
            source,
        })?;
        write_atomic(&self.record_path(script), &record)?;

        if !artifact.is_empty() {
            write_atomic(&self.artifact_path(script), artifact)?;
        }
        Ok(())
    }
}

/// Write to a temp file in the destination directory, then rename over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), BaselineError> {
    let wrap = |source: std::io::Error| BaselineError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(wrap)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(data).map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}
