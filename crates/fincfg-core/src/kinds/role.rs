//! User roles

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{MapContext, MappingError, Payload, SpecReader};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::Text),
    FieldSpec::optional("description", FieldType::Text),
    FieldSpec::optional("disabled", FieldType::Bool),
    FieldSpec::optional("permissions", FieldType::List),
];

pub const ROLE: KindConfig = KindConfig {
    kind: "Role",
    directory: "roles",
    endpoint: "roles",
    identity: KeyField::new("name", "name"),
    fallback_keys: &[],
    reference_fields: &["name"],
    declared_references: &[],
    fields: FIELDS,
    to_payload,
    parent_field: None,
    remote_paths: &[],
    write_only: &[],
    drift_fields: &[
        DriftField::plain("description", "description"),
        DriftField::plain("disabled", "disabled"),
    ],
};

// Permission grants go through a separate endpoint and are not reconciled.
fn to_payload(entity: &DeclaredEntity, _ctx: &mut MapContext<'_>) -> Result<Payload, MappingError> {
    let spec = SpecReader::new(entity);
    let mut payload = Payload::new();

    payload.insert("name".into(), json!(spec.required_text("name")?));
    payload.insert(
        "description".into(),
        json!(spec.text("description").unwrap_or_default()),
    );
    payload.insert("disabled".into(), json!(spec.flag("disabled")?.unwrap_or(false)));

    Ok(payload)
}
