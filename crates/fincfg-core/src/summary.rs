//! Run summaries

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::outcome::Outcome;

/// Final outcome of one declared entity
#[derive(Debug, Clone, Serialize)]
pub struct EntityResult {
    pub kind: String,
    /// Natural key, or document name when the key could not be read
    pub key: String,
    pub source: PathBuf,
    pub outcome: Outcome,
    /// Pass in which the outcome was reached
    pub pass: usize,
}

/// A document that was read but has no kind configuration
#[derive(Debug, Clone, Serialize)]
pub struct IgnoredDocument {
    pub kind: String,
    pub name: String,
    pub source: PathBuf,
}

/// Outcome counts for one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl Counts {
    fn add(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created { .. } => self.created += 1,
            Outcome::Updated { .. } => self.updated += 1,
            Outcome::SkippedUnchanged { .. } => self.unchanged += 1,
            // Deferred never survives to a final result
            Outcome::Deferred { .. } | Outcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failed
    }
}

/// Everything one `apply` run did
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub run_id: Uuid,
    pub dry_run: bool,
    /// Passes actually executed, including pass 0
    pub passes: usize,
    pub results: Vec<EntityResult>,
    pub ignored: Vec<IgnoredDocument>,
}

impl Summary {
    pub fn new(run_id: Uuid, dry_run: bool) -> Self {
        Self {
            run_id,
            dry_run,
            passes: 0,
            results: Vec::new(),
            ignored: Vec::new(),
        }
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for result in &self.results {
            counts.add(&result.outcome);
        }
        counts
    }

    /// Counts per kind, in kind-name order
    pub fn by_kind(&self) -> BTreeMap<&str, Counts> {
        let mut by_kind: BTreeMap<&str, Counts> = BTreeMap::new();
        for result in &self.results {
            by_kind.entry(result.kind.as_str()).or_default().add(&result.outcome);
        }
        by_kind
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntityResult> {
        self.results.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Share of entities that did not fail, in percent
    pub fn success_rate(&self) -> f64 {
        let counts = self.counts();
        match counts.total() {
            0 => 100.0,
            total => (total - counts.failed) as f64 / total as f64 * 100.0,
        }
    }

    /// Result for one entity, if it was processed
    pub fn result(&self, kind: &str, key: &str) -> Option<&EntityResult> {
        self.results.iter().find(|r| r.kind == kind && r.key == key)
    }
}
