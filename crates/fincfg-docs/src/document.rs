//! Declared-entity documents
//!
//! A document on disk looks like:
//!
//! ```yaml
//! apiVersion: fineract.apache.org/v1
//! kind: Office
//! metadata:
//!   name: nairobi-branch
//! spec:
//!   name: Nairobi Branch
//!   parentOffice: head-office
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw document shape as deserialized from YAML
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(rename = "apiVersion", default)]
    pub api_version: Option<String>,
    pub kind: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: Map<String, Value>,
}

/// Document metadata block
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// One declared entity, immutable once parsed
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredEntity {
    /// Document kind, e.g. `Office`
    pub kind: String,
    /// `metadata.name` of the document
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub spec: Map<String, Value>,
    /// Path of the source file, relative to the corpus root
    pub source: PathBuf,
}

impl DeclaredEntity {
    /// Build an entity directly. A non-object `spec` yields an empty spec.
    pub fn new(kind: impl Into<String>, name: impl Into<String>, spec: Value) -> Self {
        let spec = match spec {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: kind.into(),
            name: name.into(),
            labels: BTreeMap::new(),
            spec,
            source: PathBuf::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    pub(crate) fn from_document(doc: Document, source: &Path) -> Self {
        Self {
            kind: doc.kind,
            name: doc.metadata.name,
            labels: doc.metadata.labels,
            spec: doc.spec,
            source: source.to_path_buf(),
        }
    }

    /// Look up a spec value by dotted path. `null` counts as absent.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let first = self.spec.get(head)?;
        let value = match rest {
            Some(rest) => lookup(first, rest)?,
            None => first,
        };
        (!value.is_null()).then_some(value)
    }

    /// Spec value rendered as trimmed text; numbers and booleans are
    /// stringified, empty strings count as absent.
    pub fn text(&self, path: &str) -> Option<String> {
        self.get(path).and_then(value_text)
    }

    /// Human-readable pointer to where this entity was declared
    pub fn source_ref(&self) -> String {
        if self.source.as_os_str().is_empty() {
            format!("{}/{}", self.kind, self.name)
        } else {
            self.source.display().to_string()
        }
    }
}

/// Look up a JSON value by dotted path, e.g. `currency.code` or `items.0.id`.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Render a scalar as trimmed text. Empty strings, null, arrays and objects
/// yield `None`.
pub fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
