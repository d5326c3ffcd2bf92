//! Payment types offered on repayments and deposits

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{MapContext, MappingError, Payload, SpecReader};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::Text),
    FieldSpec::optional("description", FieldType::Text),
    FieldSpec::optional("isCashPayment", FieldType::Bool).aliases(&["cashPayment"]),
    FieldSpec::optional("position", FieldType::Integer),
];

pub const PAYMENT_TYPE: KindConfig = KindConfig {
    kind: "PaymentType",
    directory: "payment-types",
    endpoint: "paymenttypes",
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
        DriftField::plain("isCashPayment", "isCashPayment"),
        DriftField::plain("position", "position"),
    ],
};

fn to_payload(entity: &DeclaredEntity, _ctx: &mut MapContext<'_>) -> Result<Payload, MappingError> {
    let spec = SpecReader::new(entity);
    let mut payload = Payload::new();

    payload.insert("name".into(), json!(spec.required_text("name")?));
    payload.insert(
        "description".into(),
        json!(spec.text("description").unwrap_or_default()),
    );
    payload.insert(
        "isCashPayment".into(),
        json!(spec.flag("isCashPayment")?.unwrap_or(false)),
    );
    if let Some(position) = spec.integer("position")? {
        payload.insert("position".into(), json!(position));
    }

    Ok(payload)
}
