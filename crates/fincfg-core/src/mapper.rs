//! Payload mapping primitives
//!
//! Each kind's mapping function turns a normalized [`DeclaredEntity`] into
//! the JSON body the remote API expects. Mapping is pure apart from
//! reference resolution, which goes through [`MapContext`].

use chrono::NaiveDate;
use serde_json::{Map, Value};

use fincfg_docs::DeclaredEntity;

use crate::index::DeclaredIndex;

/// Remote request body
pub type Payload = Map<String, Value>;

/// Locale sent alongside every localized field
pub const LOCALE: &str = "en";

/// Remote date pattern paired with [`DATE_FORMAT_CHRONO`]
pub const DATE_FORMAT: &str = "dd MMMM yyyy";
pub const DATE_FORMAT_CHRONO: &str = "%d %B %Y";

/// Declared-side date pattern
pub const DECLARED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Why an entity could not be mapped
#[derive(Debug, Clone, thiserror::Error)]
pub enum MappingError {
    /// The referenced entity has no remote counterpart (yet)
    #[error("{field}: {kind} '{key}' not found")]
    UnresolvedReference {
        field: String,
        kind: String,
        key: String,
    },

    /// The referenced key matches more than one remote entity
    #[error("{field}: {kind} '{key}' matches several remote entities {ids:?}")]
    AmbiguousReference {
        field: String,
        kind: String,
        key: String,
        ids: Vec<i64>,
    },

    /// An enum label outside the lookup table
    #[error("{field}: unknown value '{value}' (expected one of: {allowed})")]
    UnknownValue {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("{field}: required field is missing")]
    MissingField { field: String },

    #[error("{field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Resolution itself failed at the transport layer
    #[error("{field}: looking up {kind} '{key}' failed: {source}")]
    Lookup {
        field: String,
        kind: String,
        key: String,
        #[source]
        source: fincfg_transport::Error,
    },
}

impl MappingError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result of resolving one reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(i64),
    Ambiguous(Vec<i64>),
    Unresolved,
}

/// Something that can turn `(kind, natural key)` into a remote ID
pub trait ResolveReference {
    fn resolve(&mut self, kind: &str, key: &str) -> fincfg_transport::Result<Resolution>;
}

/// Everything a mapping function may consult besides the entity itself
pub struct MapContext<'a> {
    resolver: &'a mut dyn ResolveReference,
    index: &'a DeclaredIndex,
}

impl<'a> MapContext<'a> {
    pub fn new(resolver: &'a mut dyn ResolveReference, index: &'a DeclaredIndex) -> Self {
        Self { resolver, index }
    }

    /// Resolve the reference held in `field` to a remote ID.
    ///
    /// A reference may name the target by natural key, by its document
    /// `metadata.name`, or by any other key the target's kind accepts.
    pub fn reference(&mut self, field: &str, kind: &str, key: &str) -> Result<i64, MappingError> {
        let key = self.index.canonical(kind, key.trim());
        match self.resolver.resolve(kind, &key) {
            Ok(Resolution::Found(id)) => Ok(id),
            Ok(Resolution::Ambiguous(ids)) => Err(MappingError::AmbiguousReference {
                field: field.to_string(),
                kind: kind.to_string(),
                key,
                ids,
            }),
            Ok(Resolution::Unresolved) => Err(MappingError::UnresolvedReference {
                field: field.to_string(),
                kind: kind.to_string(),
                key,
            }),
            Err(source) => Err(MappingError::Lookup {
                field: field.to_string(),
                kind: kind.to_string(),
                key,
                source,
            }),
        }
    }
}

/// Fixed label-to-code table for one remote enum
#[derive(Debug)]
pub struct EnumTable {
    pub name: &'static str,
    pub entries: &'static [(&'static str, i64)],
    /// Label used when the field is absent
    pub default: Option<&'static str>,
}

impl EnumTable {
    /// Code for a label, after normalization
    pub fn code(&self, label: &str) -> Option<i64> {
        let label = normalize_label(label);
        self.entries
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, code)| *code)
    }

    pub fn allowed(&self) -> String {
        self.entries
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `"Percentage of Amount"` -> `"PERCENTAGE_OF_AMOUNT"`
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Typed accessors over a declared spec, producing [`MappingError`]s
pub struct SpecReader<'a> {
    entity: &'a DeclaredEntity,
}

impl<'a> SpecReader<'a> {
    pub fn new(entity: &'a DeclaredEntity) -> Self {
        Self { entity }
    }

    pub fn text(&self, field: &str) -> Option<String> {
        self.entity.text(field)
    }

    pub fn required_text(&self, field: &str) -> Result<String, MappingError> {
        self.text(field).ok_or_else(|| MappingError::MissingField {
            field: field.to_string(),
        })
    }

    pub fn number(&self, field: &str) -> Result<Option<f64>, MappingError> {
        match self.entity.get(field) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| MappingError::invalid(field, "not a finite number")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| MappingError::invalid(field, format!("'{}' is not a number", s))),
            Some(other) => Err(MappingError::invalid(field, format!("expected a number, got {}", other))),
        }
    }

    pub fn required_number(&self, field: &str) -> Result<f64, MappingError> {
        self.number(field)?.ok_or_else(|| MappingError::MissingField {
            field: field.to_string(),
        })
    }

    pub fn integer(&self, field: &str) -> Result<Option<i64>, MappingError> {
        match self.entity.get(field) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| MappingError::invalid(field, format!("{} is not a whole number", n))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| MappingError::invalid(field, format!("'{}' is not a whole number", s))),
            Some(other) => Err(MappingError::invalid(
                field,
                format!("expected a whole number, got {}", other),
            )),
        }
    }

    pub fn required_integer(&self, field: &str) -> Result<i64, MappingError> {
        self.integer(field)?.ok_or_else(|| MappingError::MissingField {
            field: field.to_string(),
        })
    }

    pub fn flag(&self, field: &str) -> Result<Option<bool>, MappingError> {
        match self.entity.get(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(MappingError::invalid(field, format!("'{}' is not true or false", s))),
            },
            Some(other) => Err(MappingError::invalid(field, format!("expected true or false, got {}", other))),
        }
    }

    /// A declared `YYYY-MM-DD` date rendered in the remote date format
    pub fn date(&self, field: &str) -> Result<Option<String>, MappingError> {
        let Some(raw) = self.text(field) else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(&raw, DECLARED_DATE_FORMAT)
            .map(|date| Some(date.format(DATE_FORMAT_CHRONO).to_string()))
            .map_err(|_| MappingError::invalid(field, format!("'{}' is not a YYYY-MM-DD date", raw)))
    }

    /// Enum code for `field`, falling back to the table default when absent
    pub fn code(&self, field: &str, table: &EnumTable) -> Result<i64, MappingError> {
        let label = match self.text(field) {
            Some(label) => label,
            None => match table.default {
                Some(default) => default.to_string(),
                None => {
                    return Err(MappingError::MissingField {
                        field: field.to_string(),
                    });
                }
            },
        };
        table.code(&label).ok_or_else(|| MappingError::UnknownValue {
            field: field.to_string(),
            value: label,
            allowed: table.allowed(),
        })
    }

    /// A list of scalar references, e.g. charge names
    pub fn list(&self, field: &str) -> Result<Vec<String>, MappingError> {
        match self.entity.get(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    fincfg_docs::value_text(item)
                        .ok_or_else(|| MappingError::invalid(field, format!("unexpected list item {}", item)))
                })
                .collect(),
            Some(other) => Err(MappingError::invalid(field, format!("expected a list, got {}", other))),
        }
    }
}
