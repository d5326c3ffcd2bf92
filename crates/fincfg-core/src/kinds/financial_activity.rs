//! Financial activity mappings: which GL account books each system activity
//!
//! The remote keeps at most one mapping per activity, so the activity's
//! display name is the natural key.

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{EnumTable, MapContext, MappingError, Payload, SpecReader};

pub const ACTIVITY: EnumTable = EnumTable {
    name: "financial activity",
    entries: &[
        ("ASSET_TRANSFER", 100),
        ("CASH_AT_MAINVAULT", 101),
        ("CASH_AT_TELLER", 102),
        ("FUND_SOURCE", 103),
        ("ASSET_FUND_SOURCE", 103),
        ("LIABILITY_TRANSFER", 200),
        ("PAYABLE_DIVIDENDS", 201),
        ("OPENING_BALANCES_CONTRA", 300),
        ("OPENING_BALANCES_TRANSFER_CONTRA", 300),
    ],
    default: None,
};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("financialActivityName", FieldType::Text).aliases(&["financialActivity", "activity"]),
    FieldSpec::required("glAccountCode", FieldType::Text).aliases(&["glAccount", "glCode"]),
];

pub const FINANCIAL_ACTIVITY_MAPPING: KindConfig = KindConfig {
    kind: "FinancialActivityMapping",
    directory: "financial-activity-mappings",
    endpoint: "financialactivityaccounts",
    identity: KeyField::new("financialActivityName", "financialActivityData.name"),
    fallback_keys: &[],
    reference_fields: &["financialActivityData.name"],
    declared_references: &[],
    fields: FIELDS,
    to_payload,
    parent_field: None,
    remote_paths: &[
        ("financialActivityId", "financialActivityData.id"),
        ("glAccountId", "glAccountData.id"),
    ],
    write_only: &[],
    drift_fields: &[DriftField::plain("glAccountCode", "glAccountData.glCode")],
};

fn to_payload(entity: &DeclaredEntity, ctx: &mut MapContext<'_>) -> Result<Payload, MappingError> {
    let spec = SpecReader::new(entity);
    let mut payload = Payload::new();

    payload.insert(
        "financialActivityId".into(),
        json!(spec.code("financialActivityName", &ACTIVITY)?),
    );
    let account = spec.required_text("glAccountCode")?;
    payload.insert(
        "glAccountId".into(),
        json!(ctx.reference("glAccountCode", "GLAccount", &account)?),
    );

    Ok(payload)
}
