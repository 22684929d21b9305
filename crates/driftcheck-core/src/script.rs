//! Test script identity and corpus discovery.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{HarnessError, Result};

/// Category name whose scripts are defined to fail compilation.
pub const EXPECTED_FAILURE_CATEGORY: &str = "error_cases";

/// Category assigned to scripts sitting directly in the scripts root.
pub const ROOT_CATEGORY: &str = "";

/// Whether a script is supposed to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    MustCompile,
    MustFail,
}

/// One script in the corpus.
///
/// The expectation is resolved once, from the category, when the script is
/// discovered. Nothing downstream inspects path strings again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestScript {
    /// Path used to invoke the compiler.
    pub path: PathBuf,

    /// Path relative to the scripts root. Identity of the script.
    pub relative: PathBuf,

    /// First segment of `relative`, or [`ROOT_CATEGORY`].
    pub category: String,

    pub expectation: Expectation,
}

impl TestScript {
    /// Build a script from its location under `scripts_root`.
    ///
    /// `expected_failure_category` names the category whose members must
    /// fail compilation.
    pub fn new(scripts_root: &Path, path: PathBuf, expected_failure_category: &str) -> Self {
        let relative = path
            .strip_prefix(scripts_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        let category = category_of(&relative);
        let expectation = if category == expected_failure_category {
            Expectation::MustFail
        } else {
            Expectation::MustCompile
        };
        Self {
            path,
            relative,
            category,
            expectation,
        }
    }

    pub fn is_expected_failure(&self) -> bool {
        self.expectation == Expectation::MustFail
    }

    /// Relative path with `/` separators, as written into records.
    pub fn id(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn category_of(relative: &Path) -> String {
    let mut parts = relative.components().filter_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
        _ => None,
    });
    match (parts.next(), parts.next()) {
        (Some(first), Some(_)) => first,
        _ => ROOT_CATEGORY.to_string(),
    }
}

/// Enumerates scripts under a scripts root.
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    root: PathBuf,
    extension: String,
    expected_failure_category: String,
}

impl ScriptCatalog {
    pub fn new(
        root: impl Into<PathBuf>,
        extension: impl Into<String>,
        expected_failure_category: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            expected_failure_category: expected_failure_category.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discover scripts, either the whole corpus (recursively) or the files
    /// directly inside a single category directory.
    ///
    /// Results are sorted by relative path. A missing root, a missing
    /// category directory or an empty result are all fatal.
    pub fn discover(&self, category: Option<&str>) -> Result<Vec<TestScript>> {
        if !self.root.is_dir() {
            return Err(HarnessError::ScriptsRootMissing(self.root.clone()));
        }

        // A category run only takes the scripts directly inside it.
        let (search_root, walker) = match category {
            Some(name) => {
                let dir = self.root.join(name);
                if !dir.is_dir() {
                    return Err(HarnessError::CategoryNotFound(name.to_string()));
                }
                let walker = WalkDir::new(&dir).max_depth(1);
                (dir, walker)
            }
            None => (self.root.clone(), WalkDir::new(&self.root)),
        };

        let mut scripts = Vec::new();
        for entry in walker.sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            scripts.push(TestScript::new(
                &self.root,
                path,
                &self.expected_failure_category,
            ));
        }

        if scripts.is_empty() {
            return Err(HarnessError::NoScripts(search_root));
        }

        scripts.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(scripts)
    }
}
