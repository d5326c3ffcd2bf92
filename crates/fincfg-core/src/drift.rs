//! Drift detection: declared corpus versus live remote state
//!
//! Drift is read-only. For every requested kind the detector lists the
//! remote collection once and compares it with the declared entities by
//! natural key, reporting entities missing on either side and allow-listed
//! fields whose values differ.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use fincfg_docs::{Corpus, DeclaredEntity, lookup, normalize, value_text};
use fincfg_transport::{Remote, list_items};

use crate::compare::values_equal;
use crate::kinds::{DriftField, DriftValue, KindConfig, KindTable};
use crate::{Error, Result};

const RULE_WIDTH: usize = 60;

/// Category of one drift finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftType {
    /// Declared but absent remotely
    MissingInRemote,
    /// Present remotely but not declared
    MissingInDeclaration,
    /// Present on both sides with a differing field
    FieldMismatch,
}

impl fmt::Display for DriftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MissingInRemote => "missing-in-remote",
            Self::MissingInDeclaration => "missing-in-declaration",
            Self::FieldMismatch => "field-mismatch",
        };
        f.write_str(label)
    }
}

/// One difference between declaration and remote state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftFinding {
    pub entity_kind: String,
    /// Natural key of the entity
    pub name: String,
    pub drift_type: DriftType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

impl DriftFinding {
    fn new(kind: &str, name: &str, drift_type: DriftType) -> Self {
        Self {
            entity_kind: kind.to_string(),
            name: name.to_string(),
            drift_type,
            field: None,
            declared_value: None,
            remote_value: None,
            source_ref: None,
        }
    }

    /// One-line description, as used in text reports
    pub fn message(&self) -> String {
        match self.drift_type {
            DriftType::MissingInRemote => {
                format!("{} '{}' is declared but does not exist remotely", self.entity_kind, self.name)
            }
            DriftType::MissingInDeclaration => {
                format!("{} '{}' exists remotely but is not declared", self.entity_kind, self.name)
            }
            DriftType::FieldMismatch => format!(
                "{} '{}' differs in {}",
                self.entity_kind,
                self.name,
                self.field.as_deref().unwrap_or("?")
            ),
        }
    }
}

/// A kind that could not be checked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftError {
    pub kind: String,
    pub message: String,
}

/// Result of one drift run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub detected_at: DateTime<Utc>,
    pub kinds_checked: Vec<String>,
    pub findings: Vec<DriftFinding>,
    pub errors: Vec<DriftError>,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Findings of one kind, in report order
    pub fn findings_for<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a DriftFinding> + 'a {
        self.findings.iter().filter(move |f| f.entity_kind == kind)
    }

    /// Plain-text report grouped by kind
    pub fn format_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);

        if !self.has_drift() {
            out.push_str("No configuration drift detected. Declarations and remote state are in sync.\n");
        } else {
            let _ = writeln!(out, "CONFIGURATION DRIFT DETECTED");
            let _ = writeln!(out, "{}", rule);
            let _ = writeln!(out, "Drift findings: {}", self.findings.len());
            let _ = writeln!(out, "Detection time: {}", self.detected_at.to_rfc3339());

            let mut by_kind: Vec<(&str, Vec<&DriftFinding>)> = Vec::new();
            for finding in &self.findings {
                match by_kind.last_mut() {
                    Some((kind, group)) if *kind == finding.entity_kind => group.push(finding),
                    _ => by_kind.push((finding.entity_kind.as_str(), vec![finding])),
                }
            }

            for (kind, group) in by_kind {
                let _ = writeln!(out);
                let _ = writeln!(out, "{} ({} issues):", kind.to_uppercase(), group.len());
                let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
                for finding in group {
                    let _ = writeln!(out, "  * {}", finding.name);
                    let _ = writeln!(out, "    Drift type: {}", finding.drift_type);
                    if let Some(field) = &finding.field {
                        let _ = writeln!(out, "    Field: {}", field);
                        let _ = writeln!(out, "    Declared value: {}", show(finding.declared_value.as_ref()));
                        let _ = writeln!(out, "    Remote value: {}", show(finding.remote_value.as_ref()));
                    } else {
                        let _ = writeln!(out, "    {}", finding.message());
                    }
                    if let Some(source) = &finding.source_ref {
                        let _ = writeln!(out, "    Source: {}", source);
                    }
                }
            }

            let _ = writeln!(out);
            let _ = writeln!(out, "{}", rule);
            let _ = writeln!(out, "Remote changes were made outside the declared configuration.");
            let _ = writeln!(out, "Declare them, or re-apply the declarations to revert them.");
        }

        if self.has_errors() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Kinds that could not be checked:");
            for error in &self.errors {
                let _ = writeln!(out, "  * {}: {}", error.kind, error.message);
            }
        }
        out
    }
}

fn show(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "(none)".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Compares a declared corpus with remote state
pub struct DriftDetector<'a> {
    remote: &'a dyn Remote,
    kinds: &'a KindTable,
    corpus: &'a Corpus,
}

impl<'a> DriftDetector<'a> {
    pub fn new(remote: &'a dyn Remote, kinds: &'a KindTable, corpus: &'a Corpus) -> Self {
        Self { remote, kinds, corpus }
    }

    /// Check the named kinds, or every kind when `kinds` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown kind name or an authentication
    /// failure. Other listing failures are recorded in the report.
    pub fn detect(&self, kinds: &[String]) -> Result<DriftReport> {
        let selected = self.select(kinds)?;
        let mut report = DriftReport {
            detected_at: Utc::now(),
            kinds_checked: Vec::new(),
            findings: Vec::new(),
            errors: Vec::new(),
        };

        for config in selected {
            tracing::info!("=> Checking {}", config.kind);
            let remote = match self.remote.get(config.endpoint) {
                Ok(response) => list_items(response),
                Err(err) if err.is_auth() => return Err(err.into()),
                Err(err) => {
                    tracing::error!("Could not list {}: {}", config.kind, err);
                    report.errors.push(DriftError {
                        kind: config.kind.to_string(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            let mut findings = self.compare_kind(config, &remote);
            findings.sort_by(|a, b| (&a.name, a.drift_type).cmp(&(&b.name, b.drift_type)));
            tracing::info!("{}: {} finding(s)", config.kind, findings.len());

            report.kinds_checked.push(config.kind.to_string());
            report.findings.extend(findings);
        }

        Ok(report)
    }

    fn select(&self, names: &[String]) -> Result<Vec<&'a KindConfig>> {
        if names.is_empty() {
            return Ok(self.kinds.iter().collect());
        }
        let mut selected = Vec::new();
        for name in names {
            let config = self.kinds.get(name).ok_or_else(|| Error::UnknownKind { kind: name.clone() })?;
            if !selected.iter().any(|c: &&KindConfig| c.kind == config.kind) {
                selected.push(config);
            }
        }
        selected.sort_by_key(|c| self.kinds.position(c.kind));
        Ok(selected)
    }

    fn compare_kind(&self, config: &KindConfig, remote: &[Value]) -> Vec<DriftFinding> {
        let mut declared: BTreeMap<String, DeclaredEntity> = BTreeMap::new();
        for entity in self.corpus.of_kind(config.kind) {
            match normalize(entity, config.fields) {
                Ok(normalized) => {
                    if let Some(key) = config.key_of(&normalized) {
                        declared.entry(key).or_insert(normalized);
                    }
                }
                Err(_) => tracing::warn!("Skipping invalid {} in drift check", entity.source_ref()),
            }
        }

        let mut by_key: BTreeMap<String, &Value> = BTreeMap::new();
        for item in remote {
            let Some(key) = lookup(item, config.identity.remote).and_then(value_text) else {
                continue;
            };
            if by_key.contains_key(&key) {
                tracing::warn!(
                    kind = config.kind,
                    "More than one remote entity has {} '{}', comparing the first",
                    config.identity.remote,
                    key
                );
                continue;
            }
            by_key.insert(key, item);
        }
        let remote = by_key;

        let mut findings = Vec::new();
        for (key, entity) in &declared {
            match remote.get(key) {
                None => {
                    let mut finding = DriftFinding::new(config.kind, key, DriftType::MissingInRemote);
                    finding.source_ref = Some(entity.source_ref());
                    findings.push(finding);
                }
                Some(item) => {
                    for field in config.drift_fields {
                        if let Some(finding) = compare_field(config, key, entity, item, field) {
                            findings.push(finding);
                        }
                    }
                }
            }
        }
        for key in remote.keys().filter(|key| !declared.contains_key(*key)) {
            findings.push(DriftFinding::new(config.kind, key, DriftType::MissingInDeclaration));
        }
        findings
    }
}

/// Compare one allow-listed field; undeclared fields are not compared
fn compare_field(
    config: &KindConfig,
    key: &str,
    entity: &DeclaredEntity,
    remote: &Value,
    field: &DriftField,
) -> Option<DriftFinding> {
    let declared = entity.get(field.declared)?;
    let comparable = match field.value {
        DriftValue::Plain => declared.clone(),
        DriftValue::Code(table) => value_text(declared)
            .and_then(|label| table.code(&label))
            .map(|code| json!(code))
            .unwrap_or_else(|| declared.clone()),
    };
    let remote_value = lookup(remote, field.remote);
    if values_equal(&comparable, remote_value) {
        return None;
    }

    let mut finding = DriftFinding::new(config.kind, key, DriftType::FieldMismatch);
    finding.field = Some(field.declared.to_string());
    finding.declared_value = Some(declared.clone());
    finding.remote_value = Some(remote_value.cloned().unwrap_or(Value::Null));
    finding.source_ref = Some(entity.source_ref());
    Some(finding)
}
