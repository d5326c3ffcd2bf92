//! Network-free corpus validation
//!
//! Runs the same parse, schema and duplicate-key checks as a load, without
//! touching the remote API.

use fincfg_docs::Corpus;
use serde::Serialize;
use uuid::Uuid;

use crate::kinds::KindTable;
use crate::loader::{invalid_result, prepare};
use crate::summary::{EntityResult, IgnoredDocument, Summary};

/// Outcome of validating one corpus
#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    /// Entities that would be handed to the reconciler
    pub valid: usize,
    pub failures: Vec<EntityResult>,
    pub ignored: Vec<IgnoredDocument>,
}

impl Validation {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validate every document in `corpus` against the kind table
pub fn validate(corpus: &Corpus, kinds: &KindTable) -> Validation {
    let mut summary = Summary::new(Uuid::nil(), true);
    let (planned, _) = prepare(kinds, corpus.entities(), &mut summary);

    let mut failures: Vec<EntityResult> = corpus.invalid().iter().map(invalid_result).collect();
    failures.extend(summary.results);

    tracing::info!(
        valid = planned.len(),
        invalid = failures.len(),
        ignored = summary.ignored.len(),
        "Validation finished"
    );
    Validation {
        valid: planned.len(),
        failures,
        ignored: summary.ignored,
    }
}
