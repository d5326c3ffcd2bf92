//! Fees and penalties applied to loans, savings and clients

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{EnumTable, LOCALE, MapContext, MappingError, Payload, SpecReader};

/// Charges use their own day-month pattern for due dates
pub const MONTH_DAY_FORMAT: &str = "dd MMM";

pub const APPLIES_TO: EnumTable = EnumTable {
    name: "charge applies to",
    entries: &[("LOAN", 1), ("SAVINGS", 2), ("CLIENT", 3), ("SHARES", 4)],
    default: Some("LOAN"),
};

pub const TIME_TYPE: EnumTable = EnumTable {
    name: "charge time type",
    entries: &[
        ("DISBURSEMENT", 1),
        ("SPECIFIED_DUE_DATE", 2),
        ("SAVINGS_ACTIVATION", 3),
        ("SAVINGS_CLOSURE", 4),
        ("WITHDRAWAL_FEE", 5),
        ("ANNUAL_FEE", 6),
        ("MONTHLY_FEE", 7),
        ("INSTALLMENT_FEE", 8),
        ("OVERDUE_INSTALLMENT", 9),
        ("OVERDRAFT_FEE", 10),
        ("WEEKLY_FEE", 11),
        ("TRANCHE_DISBURSEMENT", 12),
        ("SHAREACCOUNT_ACTIVATION", 13),
        ("SHARE_PURCHASE", 14),
        ("SHARE_REDEEM", 15),
    ],
    default: Some("DISBURSEMENT"),
};

pub const CALCULATION_TYPE: EnumTable = EnumTable {
    name: "charge calculation type",
    entries: &[
        ("FLAT", 1),
        ("PERCENTAGE_OF_AMOUNT", 2),
        ("PERCENTAGE_OF_AMOUNT_AND_INTEREST", 3),
        ("PERCENTAGE_OF_INTEREST", 4),
        ("PERCENTAGE_OF_DISBURSEMENT_AMOUNT", 5),
    ],
    default: Some("FLAT"),
};

pub const PAYMENT_MODE: EnumTable = EnumTable {
    name: "charge payment mode",
    entries: &[("REGULAR", 0), ("ACCOUNT_TRANSFER", 1)],
    default: Some("REGULAR"),
};

pub const FEE_FREQUENCY: EnumTable = EnumTable {
    name: "fee frequency",
    entries: &[("DAYS", 0), ("WEEKS", 1), ("MONTHS", 2), ("YEARS", 3)],
    default: None,
};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::Text),
    FieldSpec::required("currency", FieldType::Text).aliases(&["currencyCode"]),
    FieldSpec::required("amount", FieldType::Number),
    FieldSpec::optional("chargeAppliesTo", FieldType::Text).aliases(&["appliesTo"]),
    FieldSpec::optional("chargeTimeType", FieldType::Text).aliases(&["timeType"]),
    FieldSpec::optional("chargeCalculationType", FieldType::Text).aliases(&["calculationType"]),
    FieldSpec::optional("chargePaymentMode", FieldType::Text).aliases(&["paymentMode"]),
    FieldSpec::optional("active", FieldType::Bool),
    FieldSpec::optional("penalty", FieldType::Bool),
    FieldSpec::optional("minCap", FieldType::Number),
    FieldSpec::optional("maxCap", FieldType::Number),
    FieldSpec::optional("feeFrequency", FieldType::Text),
    FieldSpec::optional("feeInterval", FieldType::Integer),
    FieldSpec::optional("incomeAccount", FieldType::Text).aliases(&["incomeAccountGLCode"]),
];

pub const CHARGE: KindConfig = KindConfig {
    kind: "Charge",
    directory: "charges",
    endpoint: "charges",
    identity: KeyField::new("name", "name"),
    fallback_keys: &[],
    reference_fields: &["name"],
    declared_references: &[],
    fields: FIELDS,
    to_payload,
    parent_field: None,
    remote_paths: &[
        ("currencyCode", "currency.code"),
        ("incomeAccountId", "incomeOrLiabilityAccount.id"),
    ],
    write_only: &[],
    drift_fields: &[
        DriftField::plain("amount", "amount"),
        DriftField::plain("currency", "currency.code"),
        DriftField::code("chargeTimeType", "chargeTimeType", &TIME_TYPE),
        DriftField::code("chargeCalculationType", "chargeCalculationType", &CALCULATION_TYPE),
        DriftField::plain("active", "active"),
        DriftField::plain("penalty", "penalty"),
    ],
};

fn to_payload(entity: &DeclaredEntity, ctx: &mut MapContext<'_>) -> Result<Payload, MappingError> {
    let spec = SpecReader::new(entity);
    let mut payload = Payload::new();

    payload.insert("name".into(), json!(spec.required_text("name")?));
    payload.insert("currencyCode".into(), json!(spec.required_text("currency")?));
    payload.insert("amount".into(), json!(spec.required_number("amount")?));

    payload.insert("chargeAppliesTo".into(), json!(spec.code("chargeAppliesTo", &APPLIES_TO)?));
    payload.insert("chargeTimeType".into(), json!(spec.code("chargeTimeType", &TIME_TYPE)?));
    payload.insert(
        "chargeCalculationType".into(),
        json!(spec.code("chargeCalculationType", &CALCULATION_TYPE)?),
    );
    payload.insert(
        "chargePaymentMode".into(),
        json!(spec.code("chargePaymentMode", &PAYMENT_MODE)?),
    );

    payload.insert("active".into(), json!(spec.flag("active")?.unwrap_or(true)));
    payload.insert("penalty".into(), json!(spec.flag("penalty")?.unwrap_or(false)));
    payload.insert("locale".into(), json!(LOCALE));
    payload.insert("monthDayFormat".into(), json!(MONTH_DAY_FORMAT));

    if let Some(min) = spec.number("minCap")? {
        payload.insert("minCap".into(), json!(min));
    }
    if let Some(max) = spec.number("maxCap")? {
        payload.insert("maxCap".into(), json!(max));
    }
    if spec.text("feeFrequency").is_some() {
        payload.insert("feeFrequency".into(), json!(spec.code("feeFrequency", &FEE_FREQUENCY)?));
    }
    if let Some(interval) = spec.integer("feeInterval")? {
        payload.insert("feeInterval".into(), json!(interval));
    }
    if let Some(account) = spec.text("incomeAccount") {
        let account_id = ctx.reference("incomeAccount", "GLAccount", &account)?;
        payload.insert("incomeAccountId".into(), json!(account_id));
    }

    Ok(payload)
}
