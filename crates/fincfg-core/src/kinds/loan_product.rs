//! Loan products
//!
//! The declared document groups related terms (`principal.min`,
//! `interestRate.type`, `accounting.fundSource`) where the remote API wants
//! a flat body; the mapping below does the flattening.

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{EnumTable, LOCALE, MapContext, MappingError, Payload, SpecReader};

/// Loan products carry no dates but the API still expects a pattern
const LOAN_DATE_FORMAT: &str = "yyyy-MM-dd";

const SHORT_NAME_LEN: usize = 20;

pub const FREQUENCY: EnumTable = EnumTable {
    name: "repayment frequency",
    entries: &[("DAYS", 0), ("WEEKS", 1), ("MONTHS", 2), ("MONTHLY", 2), ("YEARS", 3)],
    default: Some("MONTHS"),
};

pub const INTEREST_TYPE: EnumTable = EnumTable {
    name: "interest type",
    entries: &[("FLAT", 0), ("DECLINING_BALANCE", 1)],
    default: Some("DECLINING_BALANCE"),
};

pub const AMORTIZATION: EnumTable = EnumTable {
    name: "amortization type",
    entries: &[("EQUAL_PRINCIPAL", 0), ("EQUAL_INSTALLMENTS", 1)],
    default: Some("EQUAL_INSTALLMENTS"),
};

pub const INTEREST_CALCULATION_PERIOD: EnumTable = EnumTable {
    name: "interest calculation period",
    entries: &[("DAILY", 0), ("SAME_AS_REPAYMENT_PERIOD", 1)],
    default: Some("SAME_AS_REPAYMENT_PERIOD"),
};

pub const ACCOUNTING: EnumTable = EnumTable {
    name: "accounting rule",
    entries: &[
        ("NONE", 1),
        ("CASH", 2),
        ("ACCRUAL_PERIODIC", 3),
        ("ACCRUAL_UPFRONT", 4),
    ],
    default: Some("NONE"),
};

/// Declared accounting entry and the payload field carrying its GL account ID
const ACCOUNT_MAPPINGS: &[(&str, &str)] = &[
    ("accounting.fundSource", "fundSourceAccountId"),
    ("accounting.loanPortfolio", "loanPortfolioAccountId"),
    ("accounting.transferInSuspense", "transfersInSuspenseAccountId"),
    ("accounting.interestOnLoans", "interestOnLoanAccountId"),
    ("accounting.incomeFromFees", "incomeFromFeeAccountId"),
    ("accounting.incomeFromPenalties", "incomeFromPenaltyAccountId"),
    ("accounting.overpaymentLiability", "overpaymentLiabilityAccountId"),
];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::Text),
    FieldSpec::optional("shortName", FieldType::Text),
    FieldSpec::optional("description", FieldType::Text),
    FieldSpec::required("currency", FieldType::Text).aliases(&["currencyCode"]),
    FieldSpec::optional("digitsAfterDecimal", FieldType::Integer),
    FieldSpec::optional("inMultiplesOf", FieldType::Integer),
    FieldSpec::required("principal.default", FieldType::Number),
    FieldSpec::required("principal.min", FieldType::Number),
    FieldSpec::required("principal.max", FieldType::Number),
    FieldSpec::required("interestRate.default", FieldType::Number),
    FieldSpec::required("interestRate.min", FieldType::Number),
    FieldSpec::required("interestRate.max", FieldType::Number),
    FieldSpec::optional("interestRate.type", FieldType::Text).aliases(&["interestType"]),
    FieldSpec::optional("interestCalculationPeriod", FieldType::Text),
    FieldSpec::required("numberOfRepayments.default", FieldType::Integer),
    FieldSpec::required("numberOfRepayments.min", FieldType::Integer),
    FieldSpec::required("numberOfRepayments.max", FieldType::Integer),
    FieldSpec::optional("repaymentEvery", FieldType::Integer),
    FieldSpec::optional("repaymentFrequency", FieldType::Text),
    FieldSpec::optional("amortizationType", FieldType::Text).aliases(&["amortization"]),
    FieldSpec::optional("gracePeriods.principal", FieldType::Integer),
    FieldSpec::optional("gracePeriods.interest", FieldType::Integer),
    FieldSpec::optional("gracePeriods.interestCharged", FieldType::Integer),
    FieldSpec::optional("allowPartialPeriodInterestCalculation", FieldType::Bool),
    FieldSpec::optional("canDefineInstallmentAmount", FieldType::Bool),
    FieldSpec::optional("interestRecalculation.enabled", FieldType::Bool),
    FieldSpec::optional("holdGuaranteeFunds", FieldType::Bool),
    FieldSpec::optional("multiDisburseLoan", FieldType::Bool),
    FieldSpec::optional("canUseForTopup", FieldType::Bool),
    FieldSpec::optional("transactionProcessingStrategyId", FieldType::Integer),
    FieldSpec::optional("charges", FieldType::List),
    FieldSpec::optional("accounting.type", FieldType::Text).aliases(&["accountingRule"]),
    FieldSpec::optional("accounting.fundSource", FieldType::Text),
    FieldSpec::optional("accounting.loanPortfolio", FieldType::Text),
    FieldSpec::optional("accounting.transferInSuspense", FieldType::Text),
    FieldSpec::optional("accounting.interestOnLoans", FieldType::Text),
    FieldSpec::optional("accounting.incomeFromFees", FieldType::Text),
    FieldSpec::optional("accounting.incomeFromPenalties", FieldType::Text),
    FieldSpec::optional("accounting.overpaymentLiability", FieldType::Text),
];

pub const LOAN_PRODUCT: KindConfig = KindConfig {
    kind: "LoanProduct",
    directory: "loan-products",
    endpoint: "loanproducts",
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
    // The remote echoes these as nested accounting mappings and strategy codes
    write_only: &[
        "fundSourceAccountId",
        "loanPortfolioAccountId",
        "transfersInSuspenseAccountId",
        "interestOnLoanAccountId",
        "incomeFromFeeAccountId",
        "incomeFromPenaltyAccountId",
        "overpaymentLiabilityAccountId",
        "transactionProcessingStrategyId",
    ],
    drift_fields: &[
        DriftField::plain("currency", "currency.code"),
        DriftField::plain("interestRate.default", "interestRatePerPeriod"),
        DriftField::plain("principal.default", "principal"),
        DriftField::plain("numberOfRepayments.default", "numberOfRepayments"),
        DriftField::code("repaymentFrequency", "repaymentFrequencyType", &FREQUENCY),
        DriftField::code("amortizationType", "amortizationType", &AMORTIZATION),
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

    payload.insert("principal".into(), json!(spec.required_number("principal.default")?));
    payload.insert("minPrincipal".into(), json!(spec.required_number("principal.min")?));
    payload.insert("maxPrincipal".into(), json!(spec.required_number("principal.max")?));

    payload.insert(
        "interestRatePerPeriod".into(),
        json!(spec.required_number("interestRate.default")?),
    );
    payload.insert(
        "minInterestRatePerPeriod".into(),
        json!(spec.required_number("interestRate.min")?),
    );
    payload.insert(
        "maxInterestRatePerPeriod".into(),
        json!(spec.required_number("interestRate.max")?),
    );
    payload.insert("interestType".into(), json!(spec.code("interestRate.type", &INTEREST_TYPE)?));
    payload.insert(
        "interestCalculationPeriodType".into(),
        json!(spec.code("interestCalculationPeriod", &INTEREST_CALCULATION_PERIOD)?),
    );

    payload.insert(
        "numberOfRepayments".into(),
        json!(spec.required_integer("numberOfRepayments.default")?),
    );
    payload.insert(
        "minNumberOfRepayments".into(),
        json!(spec.required_integer("numberOfRepayments.min")?),
    );
    payload.insert(
        "maxNumberOfRepayments".into(),
        json!(spec.required_integer("numberOfRepayments.max")?),
    );
    payload.insert(
        "repaymentEvery".into(),
        json!(spec.integer("repaymentEvery")?.unwrap_or(1)),
    );
    payload.insert(
        "repaymentFrequencyType".into(),
        json!(spec.code("repaymentFrequency", &FREQUENCY)?),
    );
    payload.insert("amortizationType".into(), json!(spec.code("amortizationType", &AMORTIZATION)?));

    for (declared, field) in [
        ("gracePeriods.principal", "graceOnPrincipalPayment"),
        ("gracePeriods.interest", "graceOnInterestPayment"),
        ("gracePeriods.interestCharged", "graceOnInterestCharged"),
    ] {
        payload.insert(field.into(), json!(spec.integer(declared)?.unwrap_or(0)));
    }

    // The API field name is misspelled upstream
    payload.insert(
        "allowPartialPeriodInterestCalcualtion".into(),
        json!(spec.flag("allowPartialPeriodInterestCalculation")?.unwrap_or(true)),
    );
    for (declared, field) in [
        ("canDefineInstallmentAmount", "canDefineInstallmentAmount"),
        ("interestRecalculation.enabled", "isInterestRecalculationEnabled"),
        ("holdGuaranteeFunds", "holdGuaranteeFunds"),
        ("multiDisburseLoan", "multiDisburseLoan"),
        ("canUseForTopup", "canUseForTopup"),
    ] {
        payload.insert(field.into(), json!(spec.flag(declared)?.unwrap_or(false)));
    }

    payload.insert(
        "transactionProcessingStrategyId".into(),
        json!(spec.integer("transactionProcessingStrategyId")?.unwrap_or(1)),
    );

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
    if Some(accounting) != ACCOUNTING.code("NONE") {
        for (declared, field) in ACCOUNT_MAPPINGS {
            if let Some(account) = spec.text(declared) {
                let account_id = ctx.reference(declared, "GLAccount", &account)?;
                payload.insert((*field).into(), json!(account_id));
            }
        }
    }

    payload.insert("dateFormat".into(), json!(LOAN_DATE_FORMAT));
    payload.insert("locale".into(), json!(LOCALE));

    Ok(payload)
}
