//! Offices: the branch hierarchy, keyed by name

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{DATE_FORMAT, LOCALE, MapContext, MappingError, Payload, SpecReader};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::Text),
    FieldSpec::optional("externalId", FieldType::Text),
    FieldSpec::optional("openingDate", FieldType::Date).aliases(&["openedOn"]),
    FieldSpec::optional("parentOffice", FieldType::Text).aliases(&["parent", "parentName"]),
];

pub const OFFICE: KindConfig = KindConfig {
    kind: "Office",
    directory: "offices",
    endpoint: "offices",
    identity: KeyField::new("name", "name"),
    fallback_keys: &[KeyField::new("externalId", "externalId")],
    reference_fields: &["name", "externalId"],
    declared_references: &["externalId"],
    fields: FIELDS,
    to_payload,
    parent_field: Some("parentOffice"),
    remote_paths: &[],
    write_only: &[],
    drift_fields: &[
        DriftField::plain("externalId", "externalId"),
        DriftField::plain("openingDate", "openingDate"),
    ],
};

fn to_payload(entity: &DeclaredEntity, ctx: &mut MapContext<'_>) -> Result<Payload, MappingError> {
    let spec = SpecReader::new(entity);
    let mut payload = Payload::new();

    payload.insert("name".into(), json!(spec.required_text("name")?));
    payload.insert("dateFormat".into(), json!(DATE_FORMAT));
    payload.insert("locale".into(), json!(LOCALE));

    if let Some(external_id) = spec.text("externalId") {
        payload.insert("externalId".into(), json!(external_id));
    }
    if let Some(opened) = spec.date("openingDate")? {
        payload.insert("openingDate".into(), json!(opened));
    }
    if let Some(parent) = spec.text("parentOffice") {
        let parent_id = ctx.reference("parentOffice", "Office", &parent)?;
        payload.insert("parentId".into(), json!(parent_id));
    }

    Ok(payload)
}
