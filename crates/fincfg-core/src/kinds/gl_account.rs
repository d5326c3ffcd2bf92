//! General-ledger accounts: the chart of accounts tree, keyed by GL code

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{EnumTable, MapContext, MappingError, Payload, SpecReader};

pub const ACCOUNT_TYPE: EnumTable = EnumTable {
    name: "GL account type",
    entries: &[
        ("ASSET", 1),
        ("LIABILITY", 2),
        ("EQUITY", 3),
        ("INCOME", 4),
        ("EXPENSE", 5),
    ],
    default: None,
};

pub const ACCOUNT_USAGE: EnumTable = EnumTable {
    name: "GL account usage",
    entries: &[("DETAIL", 1), ("HEADER", 2)],
    default: Some("DETAIL"),
};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::Text),
    FieldSpec::required("glCode", FieldType::Text).aliases(&["code"]),
    FieldSpec::required("type", FieldType::Text).aliases(&["accountType"]),
    FieldSpec::optional("usage", FieldType::Text),
    FieldSpec::optional("manualEntriesAllowed", FieldType::Bool),
    FieldSpec::optional("description", FieldType::Text),
    FieldSpec::optional("parentGLCode", FieldType::Text).aliases(&["parent", "parentCode"]),
];

pub const GL_ACCOUNT: KindConfig = KindConfig {
    kind: "GLAccount",
    directory: "chart-of-accounts",
    endpoint: "glaccounts",
    identity: KeyField::new("glCode", "glCode"),
    fallback_keys: &[],
    reference_fields: &["glCode", "name"],
    declared_references: &["name"],
    fields: FIELDS,
    to_payload,
    parent_field: Some("parentGLCode"),
    remote_paths: &[],
    write_only: &[],
    drift_fields: &[
        DriftField::plain("name", "name"),
        DriftField::code("type", "type", &ACCOUNT_TYPE),
        DriftField::code("usage", "usage", &ACCOUNT_USAGE),
        DriftField::plain("manualEntriesAllowed", "manualEntriesAllowed"),
    ],
};

fn to_payload(entity: &DeclaredEntity, ctx: &mut MapContext<'_>) -> Result<Payload, MappingError> {
    let spec = SpecReader::new(entity);
    let mut payload = Payload::new();

    payload.insert("name".into(), json!(spec.required_text("name")?));
    payload.insert("glCode".into(), json!(spec.required_text("glCode")?));
    payload.insert("type".into(), json!(spec.code("type", &ACCOUNT_TYPE)?));
    payload.insert("usage".into(), json!(spec.code("usage", &ACCOUNT_USAGE)?));
    payload.insert(
        "manualEntriesAllowed".into(),
        json!(spec.flag("manualEntriesAllowed")?.unwrap_or(true)),
    );
    payload.insert(
        "description".into(),
        json!(spec.text("description").unwrap_or_default()),
    );

    if let Some(parent) = spec.text("parentGLCode") {
        let parent_id = ctx.reference("parentGLCode", "GLAccount", &parent)?;
        payload.insert("parentId".into(), json!(parent_id));
    }

    Ok(payload)
}
