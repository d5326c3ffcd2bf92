//! [`TestCorpus`] builder for declared-entity directories.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

const API_VERSION: &str = "fineract.apache.org/v1";

/// Render one declared-entity document as YAML
pub fn document(kind: &str, name: &str, spec: Value) -> String {
    let doc = json!({
        "apiVersion": API_VERSION,
        "kind": kind,
        "metadata": { "name": name },
        "spec": spec,
    });
    serde_yaml::to_string(&doc).unwrap()
}

/// A temporary directory of declared documents.
///
/// # Example
///
/// ```rust,no_run
/// use fincfg_test_utils::TestCorpus;
/// use serde_json::json;
///
/// let corpus = TestCorpus::new();
/// corpus.add("offices/head.yaml", "Office", "head-office", json!({ "name": "Head Office" }));
/// assert!(corpus.root().join("offices/head.yaml").exists());
/// ```
pub struct TestCorpus {
    temp_dir: TempDir,
}

impl Default for TestCorpus {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCorpus {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write raw text at `relative`, creating parent directories.
    ///
    /// # Panics
    /// Panics if the filesystem operations fail.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("TestCorpus::write: failed to create {parent:?}: {e}"));
        }
        fs::write(&path, contents)
            .unwrap_or_else(|e| panic!("TestCorpus::write: failed to write {path:?}: {e}"));
        path
    }

    /// Write a single well-formed document at `relative`
    pub fn add(&self, relative: &str, kind: &str, name: &str, spec: Value) -> PathBuf {
        self.write(relative, &document(kind, name, spec))
    }
}
