//! Savings products

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{EnumTable, LOCALE, MapContext, MappingError, Payload, SpecReader};

const SAVINGS_DATE_FORMAT: &str = "yyyy-MM-dd";

const SHORT_NAME_LEN: usize = 20;

pub const COMPOUNDING: EnumTable = EnumTable {
    name: "interest compounding period",
    entries: &[
        ("DAILY", 1),
        ("MONTHLY", 4),
        ("QUARTERLY", 5),
        ("SEMIANNUAL", 6),
        ("ANNUAL", 7),
    ],
    default: Some("MONTHLY"),
};

pub const POSTING: EnumTable = EnumTable {
    name: "interest posting period",
    entries: &[("MONTHLY", 4), ("QUARTERLY", 5), ("ANNUAL", 7)],
    default: Some("MONTHLY"),
};

pub const CALCULATION: EnumTable = EnumTable {
    name: "interest calculation type",
    entries: &[("DAILY_BALANCE", 1), ("AVERAGE_DAILY_BALANCE", 2)],
    default: Some("DAILY_BALANCE"),
};

pub const DAYS_IN_YEAR: EnumTable = EnumTable {
    name: "days in year",
    entries: &[("360", 360), ("364", 364), ("365", 365), ("ACTUAL", 1)],
    default: Some("365"),
};

pub const ACCOUNTING: EnumTable = EnumTable {
    name: "accounting rule",
    entries: &[("NONE", 1), ("CASH", 2)],
    default: Some("NONE"),
};

const ACCOUNT_MAPPINGS: &[(&str, &str)] = &[
    ("accounting.savingsReference", "savingsReferenceAccountId"),
    ("accounting.savingsControl", "savingsControlAccountId"),
    ("accounting.transferInSuspense", "transfersInSuspenseAccountId"),
    ("accounting.interestOnSavings", "interestOnSavingsAccountId"),
    ("accounting.incomeFromFees", "incomeFromFeeAccountId"),
    ("accounting.incomeFromPenalties", "incomeFromPenaltyAccountId"),
    ("accounting.overdraftControl", "overdraftPortfolioControlId"),
];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::Text),
    FieldSpec::optional("shortName", FieldType::Text),
    FieldSpec::optional("description", FieldType::Text),
    FieldSpec::required("currency", FieldType::Text).aliases(&["currencyCode"]),
    FieldSpec::optional("digitsAfterDecimal", FieldType::Integer),
    FieldSpec::optional("inMultiplesOf", FieldType::Integer),
    FieldSpec::optional("nominalAnnualInterestRate", FieldType::Number).aliases(&["interestRate"]),
    FieldSpec::optional("minRequiredOpeningBalance", FieldType::Number),
    FieldSpec::optional("minBalanceForInterestCalculation", FieldType::Number),
    FieldSpec::optional("interestCompoundingPeriod", FieldType::Text),
    FieldSpec::optional("interestPostingPeriod", FieldType::Text),
    FieldSpec::optional("interestCalculationType", FieldType::Text),
    FieldSpec::optional("daysInYear", FieldType::Text),
    FieldSpec::optional("withdrawalFeeForTransfers", FieldType::Bool),
    FieldSpec::optional("allowOverdraft", FieldType::Bool),
    FieldSpec::optional("dormancyTracking.enabled", FieldType::Bool),
    FieldSpec::optional("enforceMinRequiredBalance", FieldType::Bool),
    FieldSpec::optional("withHoldTax", FieldType::Bool),
    FieldSpec::optional("charges", FieldType::List),
    FieldSpec::optional("accounting.type", FieldType::Text).aliases(&["accountingRule"]),
    FieldSpec::optional("accounting.savingsReference", FieldType::Text),
    FieldSpec::optional("accounting.savingsControl", FieldType::Text),
    FieldSpec::optional("accounting.transferInSuspense", FieldType::Text),
    FieldSpec::optional("accounting.interestOnSavings", FieldType::Text),
    FieldSpec::optional("accounting.incomeFromFees", FieldType::Text),
    FieldSpec::optional("accounting.incomeFromPenalties", FieldType::Text),
    FieldSpec::optional("accounting.overdraftControl", FieldType::Text),
];

pub const SAVINGS_PRODUCT: KindConfig = KindConfig {
    kind: "SavingsProduct",
    directory: "savings-products",
    endpoint: "savingsproducts",
    identity: KeyField::new("name", "name"),
    fallback_keys: &[KeyField::new("shortName", "shortName")],
    reference_fields: &["name", "shortName"],
    declared_references: &["shortName"],
    fields: FIELDS,
    to_payload,
    parent_field: None,
    remote_paths: &[
        ("currencyCode", "currency.code"),
        ("digitsAfterDecimal", "currency.decimalPlaces"),
        ("inMultiplesOf", "currency.inMultiplesOf"),
    ],
    write_only: &[
        "savingsReferenceAccountId",
        "savingsControlAccountId",
        "transfersInSuspenseAccountId",
        "interestOnSavingsAccountId",
        "incomeFromFeeAccountId",
        "incomeFromPenaltyAccountId",
        "overdraftPortfolioControlId",
    ],
    drift_fields: &[
        DriftField::plain("currency", "currency.code"),
        DriftField::plain("nominalAnnualInterestRate", "nominalAnnualInterestRate"),
        DriftField::code(
            "interestCompoundingPeriod",
            "interestCompoundingPeriodType",
            &COMPOUNDING,
        ),
        DriftField::code("interestPostingPeriod", "interestPostingPeriodType", &POSTING),
        DriftField::plain("minRequiredOpeningBalance", "minRequiredOpeningBalance"),
    ],
};

fn to_payload(entity: &DeclaredEntity, ctx: &mut MapContext<'_>) -> Result<Payload, MappingError> {
    let spec = SpecReader::new(entity);
    let mut payload = Payload::new();

    let name = spec.required_text("name")?;
    let short_name = spec
        .text("shortName")
        .unwrap_or_else(|| name.chars().take(SHORT_NAME_LEN).collect());
    payload.insert("name".into(), json!(name));
    payload.insert("shortName".into(), json!(short_name));
    payload.insert(
        "description".into(),
        json!(spec.text("description").unwrap_or_default()),
    );

    payload.insert("currencyCode".into(), json!(spec.required_text("currency")?));
    payload.insert(
        "digitsAfterDecimal".into(),
        json!(spec.integer("digitsAfterDecimal")?.unwrap_or(2)),
    );
    payload.insert(
        "inMultiplesOf".into(),
        json!(spec.integer("inMultiplesOf")?.unwrap_or(0)),
    );

    for field in [
        "nominalAnnualInterestRate",
        "minRequiredOpeningBalance",
        "minBalanceForInterestCalculation",
    ] {
        payload.insert(field.into(), json!(spec.number(field)?.unwrap_or(0.0)));
    }

    payload.insert(
        "interestCompoundingPeriodType".into(),
        json!(spec.code("interestCompoundingPeriod", &COMPOUNDING)?),
    );
    payload.insert(
        "interestPostingPeriodType".into(),
        json!(spec.code("interestPostingPeriod", &POSTING)?),
    );
    payload.insert(
        "interestCalculationType".into(),
        json!(spec.code("interestCalculationType", &CALCULATION)?),
    );
    payload.insert(
        "interestCalculationDaysInYearType".into(),
        json!(spec.code("daysInYear", &DAYS_IN_YEAR)?),
    );

    for (declared, field) in [
        ("withdrawalFeeForTransfers", "withdrawalFeeForTransfers"),
        ("allowOverdraft", "allowOverdraft"),
        ("dormancyTracking.enabled", "isDormancyTrackingActive"),
        ("enforceMinRequiredBalance", "enforceMinRequiredBalance"),
        ("withHoldTax", "withHoldTax"),
    ] {
        payload.insert(field.into(), json!(spec.flag(declared)?.unwrap_or(false)));
    }

    let charges = spec.list("charges")?;
    if !charges.is_empty() {
        let mut ids = Vec::with_capacity(charges.len());
        for charge in &charges {
            ids.push(json!({ "id": ctx.reference("charges", "Charge", charge)? }));
        }
        payload.insert("charges".into(), json!(ids));
    }

    let accounting = spec.code("accounting.type", &ACCOUNTING)?;
    payload.insert("accountingRule".into(), json!(accounting));
    if Some(accounting) == ACCOUNTING.code("CASH") {
        for (declared, field) in ACCOUNT_MAPPINGS {
            if let Some(account) = spec.text(declared) {
                let account_id = ctx.reference(declared, "GLAccount", &account)?;
                payload.insert((*field).into(), json!(account_id));
            }
        }
    }

    payload.insert("dateFormat".into(), json!(SAVINGS_DATE_FORMAT));
    payload.insert("locale".into(), json!(LOCALE));

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DeclaredIndex;
    use crate::mapper::{ResolveReference, Resolution};
    use rstest::rstest;
    use serde_json::Value;

    struct Ledger;

    impl ResolveReference for Ledger {
        fn resolve(&mut self, kind: &str, key: &str) -> fincfg_transport::Result<Resolution> {
            Ok(match (kind, key) {
                ("GLAccount", "2100") => Resolution::Found(21),
                ("GLAccount", "1100") => Resolution::Found(11),
                _ => Resolution::Unresolved,
            })
        }
    }

    fn map(spec: Value) -> Result<Payload, MappingError> {
        let entity = DeclaredEntity::new("SavingsProduct", "passbook", spec);
        let index = DeclaredIndex::default();
        let mut resolver = Ledger;
        to_payload(&entity, &mut MapContext::new(&mut resolver, &index))
    }

    #[test]
    fn test_defaults() {
        let payload = map(json!({ "name": "Passbook Savings", "currency": "XAF" })).unwrap();

        assert_eq!(payload["shortName"], json!("Passbook Savings"));
        assert_eq!(payload["nominalAnnualInterestRate"], json!(0.0));
        assert_eq!(payload["interestCompoundingPeriodType"], json!(4));
        assert_eq!(payload["interestPostingPeriodType"], json!(4));
        assert_eq!(payload["interestCalculationType"], json!(1));
        assert_eq!(payload["interestCalculationDaysInYearType"], json!(365));
        assert_eq!(payload["accountingRule"], json!(1));
        assert_eq!(payload["isDormancyTrackingActive"], json!(false));
    }

    #[rstest]
    #[case(json!(360), 360)]
    #[case(json!("364"), 364)]
    #[case(json!("Actual"), 1)]
    fn test_days_in_year(#[case] declared: Value, #[case] code: i64) {
        let payload = map(json!({ "name": "Term", "currency": "XAF", "daysInYear": declared })).unwrap();
        assert_eq!(payload["interestCalculationDaysInYearType"], json!(code));
    }

    #[test]
    fn test_cash_accounting_maps_gl_accounts() {
        let payload = map(json!({
            "name": "Passbook Savings",
            "currency": "XAF",
            "nominalAnnualInterestRate": "3.5",
            "accounting": {
                "type": "Cash",
                "savingsReference": "1100",
                "savingsControl": "2100"
            }
        }))
        .unwrap();

        assert_eq!(payload["nominalAnnualInterestRate"], json!(3.5));
        assert_eq!(payload["accountingRule"], json!(2));
        assert_eq!(payload["savingsReferenceAccountId"], json!(11));
        assert_eq!(payload["savingsControlAccountId"], json!(21));
    }

    #[test]
    fn test_unknown_posting_period() {
        let err = map(json!({ "name": "S", "currency": "XAF", "interestPostingPeriod": "Daily" })).unwrap_err();
        assert!(matches!(err, MappingError::UnknownValue { ref allowed, .. } if allowed == "MONTHLY, QUARTERLY, ANNUAL"));
    }
}
