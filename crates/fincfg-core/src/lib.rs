//! Reconciliation engine for declared core-banking configuration
//!
//! This crate turns a corpus of declared entities into remote state and
//! reports where the two have drifted apart:
//!
//! - **[`kinds`]**: the kind table, one entry per reconcilable entity kind
//! - **[`mapper`]**: declared spec to API payload, with enum tables
//! - **[`resolver`]**: cached reference resolution against bulk listings
//! - **[`reconciler`]**: create, update or skip one entity
//! - **[`loader`]**: dependency-ordered, multi-pass loading of a corpus
//! - **[`validate`]**: the network-free subset of a load
//! - **[`drift`]**: read-only comparison of declarations and remote state
//! - **[`config`]**: layered run configuration

pub mod compare;
pub mod config;
pub mod drift;
pub mod error;
pub mod index;
pub mod kinds;
pub mod loader;
pub mod mapper;
pub mod outcome;
pub mod reconciler;
pub mod resolver;
pub mod summary;
pub mod validate;

pub use compare::{EPSILON, EXCLUDED_FIELDS, FieldChange, diff_payload, values_equal};
pub use config::{AlertsConfig, EmailConfig, RunConfig, WebhookConfig};
pub use drift::{DriftDetector, DriftError, DriftFinding, DriftReport, DriftType};
pub use error::{Error, Result};
pub use index::DeclaredIndex;
pub use kinds::{KindConfig, KindTable};
pub use loader::{Loader, LoaderOptions};
pub use mapper::{MappingError, Payload, ResolveReference, Resolution};
pub use outcome::{FailureReason, Outcome};
pub use reconciler::Reconciler;
pub use resolver::ReferenceResolver;
pub use summary::{Counts, EntityResult, IgnoredDocument, Summary};
pub use validate::{Validation, validate};
