//! Per-entity reconciliation outcomes

use std::fmt;

use serde::Serialize;

use crate::compare::FieldChange;

/// What happened to one declared entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    /// POSTed (or would have been, in a dry run)
    Created { id: Option<i64>, dry_run: bool },

    /// PUT with the full payload after a non-empty diff
    Updated {
        id: i64,
        fields: Vec<FieldChange>,
        dry_run: bool,
    },

    /// Exists and matches the declaration
    SkippedUnchanged { id: i64 },

    /// Waits on a reference declared elsewhere in this run
    Deferred { reference: String },

    Failed { reason: FailureReason },
}

impl Outcome {
    pub fn failed(reason: FailureReason) -> Self {
        Self::Failed { reason }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }

    /// True for a real (not planned) creation
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// Short status label, as printed in summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created { dry_run: true, .. } => "would create",
            Self::Created { .. } => "created",
            Self::Updated { dry_run: true, .. } => "would update",
            Self::Updated { .. } => "updated",
            Self::SkippedUnchanged { .. } => "unchanged",
            Self::Deferred { .. } => "deferred",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { id: Some(id), .. } => write!(f, "{} (ID: {})", self.label(), id),
            Self::Created { id: None, .. } => write!(f, "{}", self.label()),
            Self::Updated { id, fields, .. } => {
                let names: Vec<&str> = fields.iter().map(|c| c.field.as_str()).collect();
                write!(f, "{} (ID: {}; {})", self.label(), id, names.join(", "))
            }
            Self::SkippedUnchanged { id } => write!(f, "{} (ID: {})", self.label(), id),
            Self::Deferred { reference } => write!(f, "{} on {}", self.label(), reference),
            Self::Failed { reason } => write!(f, "{}: {}", self.label(), reason),
        }
    }
}

/// Why an entity ended up failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum FailureReason {
    /// Document did not parse or violated its kind's schema
    Invalid { messages: Vec<String> },

    /// Payload could not be built
    Mapping { message: String },

    /// A remote call failed
    Transport { message: String },

    /// Create succeeded but the response carried no `resourceId`
    MissingResourceId,

    /// A reference never became resolvable within the pass budget
    UnresolvedDependency { reference: String },

    /// Another document declares the same natural key
    DuplicateKey { key: String, first: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { messages } => write!(f, "invalid document: {}", messages.join("; ")),
            Self::Mapping { message } => write!(f, "{}", message),
            Self::Transport { message } => write!(f, "{}", message),
            Self::MissingResourceId => write!(f, "create response carried no resourceId"),
            Self::UnresolvedDependency { reference } => {
                write!(f, "unresolved dependency {}", reference)
            }
            Self::DuplicateKey { key, first } => {
                write!(f, "key '{}' is already declared in {}", key, first)
            }
        }
    }
}
