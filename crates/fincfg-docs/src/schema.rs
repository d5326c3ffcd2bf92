//! Per-kind field schemas with ordered alias lists
//!
//! Each field has one canonical name and zero or more aliases, tried in
//! order. [`normalize`] rewrites an entity so only canonical names remain
//! and reports every missing or mistyped field at once, before anything
//! touches the network.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::document::DeclaredEntity;

/// Expected shape of a declared field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    /// A number or a numeric string
    Number,
    /// A whole number or a whole-number string
    Integer,
    Bool,
    /// `YYYY-MM-DD`
    Date,
    List,
    Map,
    Any,
}

/// One declared field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical (possibly dotted) path in `spec`
    pub name: &'static str,
    /// Alternative paths, tried in order when `name` is absent
    pub aliases: &'static [&'static str],
    pub required: bool,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            aliases: &[],
            required: true,
            ty,
        }
    }

    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            aliases: &[],
            required: false,
            ty,
        }
    }

    pub const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }
}

/// A single schema problem found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Rewrite aliased fields to their canonical paths and validate types.
///
/// Fields not named by the schema are kept untouched.
///
/// # Errors
///
/// Returns every violation found: missing required fields, values of the
/// wrong type, and fields given under both the canonical name and an alias.
pub fn normalize(
    entity: &DeclaredEntity,
    fields: &[FieldSpec],
) -> std::result::Result<DeclaredEntity, Vec<Violation>> {
    let mut normalized = entity.clone();
    let mut violations = Vec::new();

    for field in fields {
        let present: Vec<&str> = std::iter::once(field.name)
            .chain(field.aliases.iter().copied())
            .filter(|path| entity.get(path).is_some())
            .collect();

        let Some(&found) = present.first() else {
            if field.required {
                violations.push(Violation {
                    field: field.name.to_string(),
                    message: "required field is missing".to_string(),
                });
            }
            continue;
        };

        if present.len() > 1 {
            violations.push(Violation {
                field: field.name.to_string(),
                message: format!("given more than once (as {})", present.join(", ")),
            });
            continue;
        }

        let Some(value) = entity.get(found).cloned() else {
            continue;
        };
        if let Err(message) = check_type(&value, field.ty) {
            violations.push(Violation {
                field: found.to_string(),
                message,
            });
            continue;
        }

        if found != field.name {
            remove_path(&mut normalized.spec, found);
            set_path(&mut normalized.spec, field.name, value);
        }
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(violations)
    }
}

fn check_type(value: &Value, ty: FieldType) -> std::result::Result<(), String> {
    let ok = match ty {
        FieldType::Any => true,
        FieldType::Text => matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)),
        FieldType::Number => match value {
            Value::Number(_) => true,
            Value::String(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        },
        FieldType::Integer => match value {
            Value::Number(n) => n.is_i64() || n.is_u64(),
            Value::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        },
        FieldType::Bool => match value {
            Value::Bool(_) => true,
            Value::String(s) => matches!(s.trim(), "true" | "false"),
            _ => false,
        },
        FieldType::Date => match value {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok(),
            _ => false,
        },
        FieldType::List => value.is_array(),
        FieldType::Map => value.is_object(),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("expected {}, got {}", type_name(ty), value))
    }
}

fn type_name(ty: FieldType) -> &'static str {
    match ty {
        FieldType::Text => "text",
        FieldType::Number => "a number",
        FieldType::Integer => "a whole number",
        FieldType::Bool => "true or false",
        FieldType::Date => "a YYYY-MM-DD date",
        FieldType::List => "a list",
        FieldType::Map => "a mapping",
        FieldType::Any => "any value",
    }
}

fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}

fn remove_path(map: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            map.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = map.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    const STAFF: &[FieldSpec] = &[
        FieldSpec::required("firstName", FieldType::Text).aliases(&["firstname"]),
        FieldSpec::required("lastName", FieldType::Text).aliases(&["lastname", "surname"]),
        FieldSpec::optional("officeId", FieldType::Text).aliases(&["office"]),
        FieldSpec::optional("joiningDate", FieldType::Date),
        FieldSpec::optional("isLoanOfficer", FieldType::Bool),
    ];

    fn staff(spec: Value) -> DeclaredEntity {
        DeclaredEntity::new("Staff", "jane", spec)
    }

    #[test]
    fn test_alias_is_rewritten_to_canonical_name() {
        let entity = staff(json!({ "firstname": "Jane", "surname": "Doe", "office": "HQ" }));
        let normalized = normalize(&entity, STAFF).unwrap();
        assert_eq!(
            Value::Object(normalized.spec),
            json!({ "firstName": "Jane", "lastName": "Doe", "officeId": "HQ" })
        );
    }

    #[test]
    fn test_all_violations_reported_together() {
        let entity = staff(json!({ "joiningDate": "01/02/2024", "isLoanOfficer": "yes" }));
        let violations = normalize(&entity, STAFF).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["firstName", "lastName", "joiningDate", "isLoanOfficer"]);
    }

    #[test]
    fn test_canonical_and_alias_together_is_a_violation() {
        let entity = staff(json!({ "firstName": "Jane", "firstname": "J", "lastName": "Doe" }));
        let violations = normalize(&entity, STAFF).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("more than once"));
    }

    #[test]
    fn test_dotted_alias_moves_into_nested_path() {
        const FIELDS: &[FieldSpec] = &[FieldSpec::required("principal.default", FieldType::Number)
            .aliases(&["principalAmount"])];
        let entity = DeclaredEntity::new("LoanProduct", "p", json!({ "principalAmount": "5000" }));
        let normalized = normalize(&entity, FIELDS).unwrap();
        assert_eq!(normalized.get("principal.default"), Some(&json!("5000")));
        assert!(normalized.get("principalAmount").is_none());
    }

    #[rstest]
    #[case(json!(12.5), FieldType::Number, true)]
    #[case(json!("12.5"), FieldType::Number, true)]
    #[case(json!("abc"), FieldType::Number, false)]
    #[case(json!(3), FieldType::Integer, true)]
    #[case(json!(3.5), FieldType::Integer, false)]
    #[case(json!("2024-01-31"), FieldType::Date, true)]
    #[case(json!("2024-02-31"), FieldType::Date, false)]
    #[case(json!(["a"]), FieldType::List, true)]
    #[case(json!({"a": 1}), FieldType::Text, false)]
    fn test_check_type(#[case] value: Value, #[case] ty: FieldType, #[case] ok: bool) {
        assert_eq!(check_type(&value, ty).is_ok(), ok);
    }
}
