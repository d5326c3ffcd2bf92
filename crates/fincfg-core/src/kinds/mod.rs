//! The kind table
//!
//! Every entity kind the engine can reconcile is described by one
//! [`KindConfig`] entry: where its documents live, which endpoint serves
//! it, how it is keyed, how it maps to a payload, and which fields the
//! drift detector compares. The table is built once at startup and passed
//! to the reconciler, loader and drift detector; its order is dependency
//! order (referenced kinds before referencing kinds).

pub mod charge;
pub mod financial_activity;
pub mod gl_account;
pub mod loan_product;
pub mod office;
pub mod payment_type;
pub mod role;
pub mod savings_product;
pub mod staff;

use fincfg_docs::{DeclaredEntity, FieldSpec};

use crate::mapper::{EnumTable, MapContext, MappingError, Payload};

/// Signature of a per-kind mapping function
pub type MapFn = fn(&DeclaredEntity, &mut MapContext<'_>) -> Result<Payload, MappingError>;

/// A key field seen from both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyField {
    /// Path in the declared spec
    pub declared: &'static str,
    /// Field in the remote entity
    pub remote: &'static str,
}

impl KeyField {
    pub const fn new(declared: &'static str, remote: &'static str) -> Self {
        Self { declared, remote }
    }
}

/// How a drift-compared field is interpreted
#[derive(Debug, Clone, Copy)]
pub enum DriftValue {
    /// Compared as-is
    Plain,
    /// Declared label, remote enum code or `{id}` object
    Code(&'static EnumTable),
}

/// One field on the drift allow-list
#[derive(Debug, Clone, Copy)]
pub struct DriftField {
    pub declared: &'static str,
    pub remote: &'static str,
    pub value: DriftValue,
}

impl DriftField {
    pub const fn plain(declared: &'static str, remote: &'static str) -> Self {
        Self {
            declared,
            remote,
            value: DriftValue::Plain,
        }
    }

    pub const fn code(declared: &'static str, remote: &'static str, table: &'static EnumTable) -> Self {
        Self {
            declared,
            remote,
            value: DriftValue::Code(table),
        }
    }
}

/// Everything the engine knows about one entity kind
#[derive(Debug, Clone, Copy)]
pub struct KindConfig {
    /// Document `kind`
    pub kind: &'static str,
    /// Conventional directory for this kind's documents
    pub directory: &'static str,
    /// API collection path, e.g. `glaccounts`
    pub endpoint: &'static str,
    /// Natural key
    pub identity: KeyField,
    /// Further keys tried, in order, when the natural key finds nothing
    pub fallback_keys: &'static [KeyField],
    /// Remote fields a reference to this kind may match
    pub reference_fields: &'static [&'static str],
    /// Declared paths, besides the natural key, a reference may name
    pub declared_references: &'static [&'static str],
    pub fields: &'static [FieldSpec],
    pub to_payload: MapFn,
    /// Declared field naming a parent of the same kind
    pub parent_field: Option<&'static str>,
    /// Payload field to remote path, where they differ
    pub remote_paths: &'static [(&'static str, &'static str)],
    /// Payload fields the remote never echoes back
    pub write_only: &'static [&'static str],
    pub drift_fields: &'static [DriftField],
}

impl KindConfig {
    /// Remote path holding the value of a payload field
    pub fn remote_path<'a>(&self, field: &'a str) -> &'a str {
        self.remote_paths
            .iter()
            .find(|(payload, _)| *payload == field)
            .map(|(_, remote)| *remote)
            .unwrap_or(field)
    }

    /// Natural key of a declared entity of this kind
    pub fn key_of(&self, entity: &DeclaredEntity) -> Option<String> {
        entity.text(self.identity.declared)
    }

    /// Values other entities may use to refer to this one, natural key aside
    pub fn aliases_of(&self, entity: &DeclaredEntity) -> Vec<String> {
        self.declared_references
            .iter()
            .filter_map(|path| entity.text(path))
            .collect()
    }

    /// Same-kind parent named by the entity, if any
    pub fn parent_of(&self, entity: &DeclaredEntity) -> Option<String> {
        self.parent_field.and_then(|field| entity.text(field))
    }
}

/// Ordered set of kind configurations
#[derive(Debug, Clone)]
pub struct KindTable {
    kinds: Vec<KindConfig>,
}

impl KindTable {
    pub fn new(kinds: Vec<KindConfig>) -> Self {
        Self { kinds }
    }

    /// All built-in kinds in dependency order
    pub fn builtin() -> Self {
        Self::new(vec![
            office::OFFICE,
            gl_account::GL_ACCOUNT,
            financial_activity::FINANCIAL_ACTIVITY_MAPPING,
            payment_type::PAYMENT_TYPE,
            charge::CHARGE,
            role::ROLE,
            loan_product::LOAN_PRODUCT,
            savings_product::SAVINGS_PRODUCT,
            staff::STAFF,
        ])
    }

    pub fn get(&self, kind: &str) -> Option<&KindConfig> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    /// Position in dependency order
    pub fn position(&self, kind: &str) -> Option<usize> {
        self.kinds.iter().position(|k| k.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KindConfig> {
        self.kinds.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.kinds.iter().map(|k| k.kind).collect()
    }
}

impl Default for KindTable {
    fn default() -> Self {
        Self::builtin()
    }
}
