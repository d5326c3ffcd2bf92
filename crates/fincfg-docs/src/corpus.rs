//! Corpus discovery
//!
//! Loads every declared-entity document under a directory tree:
//!
//! ```text
//! declared/
//!   offices/
//!     head-office.yaml
//!     nairobi.yaml
//!   charges/
//!     fees.yaml          # may hold several `---` separated documents
//!   kustomization.yaml   # skipped
//! ```
//!
//! A document that fails to parse is recorded as an [`InvalidDocument`]
//! and does not stop the rest of the corpus from loading.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::document::{DeclaredEntity, Document};
use crate::{Error, Result};

const SKIPPED_FILES: &[&str] = &["kustomization.yaml", "kustomization.yml"];

/// A document that could not be turned into a [`DeclaredEntity`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDocument {
    /// Path relative to the corpus root
    pub source: PathBuf,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub reasons: Vec<String>,
}

impl InvalidDocument {
    pub fn new(source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: None,
            name: None,
            reasons: vec![reason.into()],
        }
    }
}

/// All declared entities found under one root, in stable order
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entities: Vec<DeclaredEntity>,
    invalid: Vec<InvalidDocument>,
}

impl Corpus {
    /// Load every `.yaml`/`.yml` document below `root`.
    ///
    /// Entities are ordered by source path, then by position within a
    /// multi-document file.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory or a directory cannot
    /// be listed. Unreadable or malformed files are recorded as invalid
    /// documents instead.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        collect_files(root, &mut files)?;
        files.sort();

        let mut corpus = Corpus::default();
        for path in files {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            match fs::read_to_string(&path) {
                Ok(content) => corpus.parse_file(&content, &relative),
                Err(e) => corpus
                    .invalid
                    .push(InvalidDocument::new(&relative, format!("unreadable: {}", e))),
            }
        }

        tracing::debug!(
            "Loaded {} declared entities ({} invalid) from {}",
            corpus.entities.len(),
            corpus.invalid.len(),
            root.display()
        );
        Ok(corpus)
    }

    /// Build a corpus from already-parsed entities, keeping their order.
    pub fn from_entities(entities: Vec<DeclaredEntity>) -> Self {
        Self {
            entities,
            invalid: Vec::new(),
        }
    }

    fn parse_file(&mut self, content: &str, source: &Path) {
        for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
            let value = match serde_yaml::Value::deserialize(document) {
                Ok(value) => value,
                Err(e) => {
                    self.invalid
                        .push(InvalidDocument::new(source, format!("document {}: {}", index, e)));
                    // A syntax error leaves the stream unusable
                    break;
                }
            };
            if value.is_null() {
                continue;
            }

            match serde_yaml::from_value::<Document>(value) {
                Ok(doc) if doc.metadata.name.trim().is_empty() => {
                    self.invalid.push(InvalidDocument {
                        source: source.to_path_buf(),
                        kind: Some(doc.kind),
                        name: None,
                        reasons: vec!["metadata.name is empty".to_string()],
                    });
                }
                Ok(doc) => self.entities.push(DeclaredEntity::from_document(doc, source)),
                Err(e) => self
                    .invalid
                    .push(InvalidDocument::new(source, format!("document {}: {}", index, e))),
            }
        }
    }

    pub fn entities(&self) -> &[DeclaredEntity] {
        &self.entities
    }

    pub fn invalid(&self) -> &[InvalidDocument] {
        &self.invalid
    }

    /// Entities of one kind, in corpus order
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a DeclaredEntity> + 'a {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Distinct kinds present in the corpus
    pub fn kinds(&self) -> BTreeSet<&str> {
        self.entities.iter().map(|e| e.kind.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
            continue;
        }
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        let skipped = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| SKIPPED_FILES.contains(&name));
        if is_yaml && !skipped {
            out.push(path);
        }
    }
    Ok(())
}
