//! Declared-versus-remote value comparison
//!
//! One set of rules is shared by the reconciler's diff and the drift
//! detector:
//!
//! - numbers are equal when they differ by less than [`EPSILON`]
//! - strings are compared after trimming
//! - a declared number equals a remote enum object whose `id` matches
//! - a declared date string equals a remote `[year, month, day]` array
//! - a missing or null remote value equals a blank declared value
//!   (`""`, `false`, `0`, null)

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use fincfg_docs::lookup;

use crate::kinds::KindConfig;
use crate::mapper::Payload;

/// Absolute tolerance for numeric fields
pub const EPSILON: f64 = 1e-4;

/// Payload fields that are request metadata, never entity state
pub const EXCLUDED_FIELDS: &[&str] = &["id", "resourceId", "locale", "dateFormat", "monthDayFormat"];

const DATE_FORMATS: &[&str] = &["%d %B %Y", "%Y-%m-%d", "%d %b %Y"];

/// One differing field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub declared: Value,
    pub remote: Value,
}

/// Compare every payload field against the live entity.
///
/// Only fields present in the payload are considered; fields unique to
/// the remote entity are never reported here.
pub fn diff_payload(payload: &Payload, remote: &Value, kind: &KindConfig) -> Vec<FieldChange> {
    payload
        .iter()
        .filter(|(field, _)| !EXCLUDED_FIELDS.contains(&field.as_str()))
        .filter(|(field, _)| !kind.write_only.contains(&field.as_str()))
        .filter_map(|(field, declared)| {
            let remote_value = lookup(remote, kind.remote_path(field));
            if values_equal(declared, remote_value) {
                None
            } else {
                Some(FieldChange {
                    field: field.clone(),
                    declared: declared.clone(),
                    remote: remote_value.cloned().unwrap_or(Value::Null),
                })
            }
        })
        .collect()
}

/// True if a declared value and a remote value mean the same thing
pub fn values_equal(declared: &Value, remote: Option<&Value>) -> bool {
    let remote = match remote {
        None | Some(Value::Null) => return is_blank(declared),
        Some(remote) => remote,
    };

    match (declared, remote) {
        (Value::Null, remote) => is_blank(remote),

        // Remote enums come back as `{id, code, value}`
        (Value::Number(_) | Value::String(_), Value::Object(obj)) if obj.contains_key("id") => {
            values_equal(declared, obj.get("id"))
        }

        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => numbers_equal(a, b),
            _ => false,
        },
        (Value::Number(a), Value::String(b)) | (Value::String(b), Value::Number(a)) => {
            match (a.as_f64(), b.trim().parse::<f64>()) {
                (Some(a), Ok(b)) => numbers_equal(a, b),
                _ => false,
            }
        }

        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(a), Value::String(b)) => b.trim() == a.to_string(),

        (Value::String(a), Value::String(b)) => a.trim() == b.trim(),
        (Value::String(a), Value::Array(parts)) => match (parse_date(a), date_from_parts(parts)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },

        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter().all(|item| b.iter().any(|other| values_equal(item, Some(other))))
        }

        (Value::Object(a), Value::Object(b)) => {
            a.iter().all(|(key, value)| values_equal(value, b.get(key)))
        }

        _ => false,
    }
}

fn numbers_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text.trim(), format).ok())
}

fn date_from_parts(parts: &[Value]) -> Option<NaiveDate> {
    match parts {
        [year, month, day] => NaiveDate::from_ymd_opt(
            i32::try_from(year.as_i64()?).ok()?,
            u32::try_from(month.as_i64()?).ok()?,
            u32::try_from(day.as_i64()?).ok()?,
        ),
        _ => None,
    }
}
