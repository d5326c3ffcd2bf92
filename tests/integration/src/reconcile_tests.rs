//! Loader behaviour across kinds against an in-memory remote
//!
//! Covers repeat runs, parent hierarchies declared in any order, parent
//! cycles, and numeric tolerance in the update diff.

use fincfg_core::{FailureReason, KindTable, Loader, LoaderOptions, Outcome, Summary};
use fincfg_docs::DeclaredEntity;
use fincfg_test_utils::FakeRemote;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn entity(kind: &str, name: &str, source: &str, spec: Value) -> DeclaredEntity {
    DeclaredEntity::new(kind, name, spec).with_source(source)
}

fn load(remote: &FakeRemote, entities: &[DeclaredEntity]) -> Summary {
    let kinds = KindTable::builtin();
    Loader::new(remote, &kinds, LoaderOptions::default())
        .load_all(entities)
        .unwrap()
}

fn institution() -> Vec<DeclaredEntity> {
    vec![
        entity("Office", "head-office", "offices/head.yaml", json!({ "name": "Head Office" })),
        entity(
            "Office",
            "coast",
            "offices/coast.yaml",
            json!({ "name": "Coast Region", "parentOffice": "head-office" }),
        ),
        entity(
            "Office",
            "mombasa",
            "offices/mombasa.yaml",
            json!({ "name": "Mombasa", "externalId": "BR-MBA-001", "parentOffice": "Coast Region" }),
        ),
        entity(
            "GLAccount",
            "assets",
            "chart-of-accounts/assets.yaml",
            json!({ "name": "Assets", "glCode": "1000", "type": "ASSET", "usage": "HEADER" }),
        ),
        entity(
            "GLAccount",
            "cash",
            "chart-of-accounts/cash.yaml",
            json!({ "name": "Cash", "glCode": "1100", "type": "ASSET", "parentGLCode": "1000" }),
        ),
        entity(
            "Role",
            "teller",
            "roles/teller.yaml",
            json!({ "name": "Teller", "description": "Front desk" }),
        ),
        entity(
            "Staff",
            "jane",
            "staff/jane.yaml",
            json!({
                "externalId": "EMP-001",
                "firstName": "Jane",
                "lastName": "Wanjiru",
                "office": "mombasa",
                "isLoanOfficer": true
            }),
        ),
    ]
}

#[test]
fn test_second_run_is_a_no_op() {
    let remote = FakeRemote::new();

    let first = load(&remote, &institution());
    assert!(!first.has_failures(), "{:#?}", first.failures().collect::<Vec<_>>());
    assert_eq!(first.counts().created, 7);

    let writes = remote.posts() + remote.puts();
    let second = load(&remote, &institution());

    let counts = second.counts();
    assert_eq!((counts.created, counts.updated, counts.failed), (0, 0, 0));
    assert_eq!(counts.unchanged, 7);
    assert_eq!(remote.posts() + remote.puts(), writes);
}

#[test]
fn test_staff_office_resolved_through_hierarchy() {
    let remote = FakeRemote::new();
    load(&remote, &institution());

    let mombasa = remote
        .entities("offices")
        .into_iter()
        .find(|o| o["name"] == json!("Mombasa"))
        .unwrap();
    let jane = &remote.entities("staff")[0];
    assert_eq!(jane["officeId"], mombasa["id"]);
    assert_eq!(jane["isLoanOfficer"], json!(true));
}

#[rstest]
#[case::declared_top_down(["a.yaml", "b.yaml", "c.yaml"])]
#[case::declared_bottom_up(["c.yaml", "b.yaml", "a.yaml"])]
#[case::declared_middle_first(["b.yaml", "c.yaml", "a.yaml"])]
fn test_three_level_hierarchy_converges(#[case] sources: [&str; 3]) {
    let [hq_source, region_source, branch_source] = sources;
    let entities = vec![
        entity("Office", "branch", branch_source, json!({ "name": "Branch", "parentOffice": "region" })),
        entity("Office", "region", region_source, json!({ "name": "Region", "parentOffice": "hq" })),
        entity("Office", "hq", hq_source, json!({ "name": "HQ" })),
    ];
    let remote = FakeRemote::new();

    let summary = load(&remote, &entities);

    assert_eq!(summary.counts().created, 3);
    assert!(summary.passes <= 3, "took {} passes", summary.passes);
}

#[test]
fn test_parent_cycle_fails_both_without_writes() {
    let entities = vec![
        entity("Office", "a", "offices/a.yaml", json!({ "name": "A", "parentOffice": "b" })),
        entity("Office", "b", "offices/b.yaml", json!({ "name": "B", "parentOffice": "a" })),
        entity("Role", "auditor", "roles/auditor.yaml", json!({ "name": "Auditor" })),
    ];
    let remote = FakeRemote::new();

    let summary = load(&remote, &entities);

    for key in ["A", "B"] {
        let result = summary.result("Office", key).unwrap();
        assert!(
            matches!(
                result.outcome,
                Outcome::Failed {
                    reason: FailureReason::UnresolvedDependency { .. }
                }
            ),
            "{key}: {:?}",
            result.outcome
        );
    }
    assert!(summary.result("Role", "Auditor").unwrap().outcome.is_created());
    assert_eq!(remote.calls().iter().filter(|c| c.as_str() == "POST offices").count(), 0);
}

#[test]
fn test_reference_by_external_id_waits_for_the_office() {
    let entities = vec![
        entity("Office", "hq", "offices/hq.yaml", json!({ "name": "HQ" })),
        entity(
            "Office",
            "branch",
            "offices/branch.yaml",
            json!({ "name": "Branch", "externalId": "BR-1", "parentOffice": "hq" }),
        ),
        entity(
            "Staff",
            "amina",
            "staff/amina.yaml",
            json!({ "externalId": "EMP-7", "firstName": "Amina", "lastName": "Otieno", "office": "BR-1" }),
        ),
    ];
    let remote = FakeRemote::new();

    let summary = load(&remote, &entities);

    let staff = summary.result("Staff", "EMP-7").unwrap();
    assert!(staff.outcome.is_created(), "{:?}", staff.outcome);
    assert!(staff.pass > 0);
    let branch = remote
        .entities("offices")
        .into_iter()
        .find(|o| o["name"] == json!("Branch"))
        .unwrap();
    assert_eq!(remote.entities("staff")[0]["officeId"], branch["id"]);
}

#[test]
fn test_income_account_by_name_waits_for_the_child_account() {
    let entities = vec![
        entity(
            "GLAccount",
            "income",
            "chart-of-accounts/income.yaml",
            json!({ "name": "Income", "glCode": "4000", "type": "INCOME", "usage": "HEADER" }),
        ),
        entity(
            "GLAccount",
            "fee-income",
            "chart-of-accounts/fee-income.yaml",
            json!({ "name": "Fee Income", "glCode": "4100", "type": "INCOME", "parentGLCode": "4000" }),
        ),
        entity(
            "Charge",
            "card-fee",
            "charges/card-fee.yaml",
            json!({
                "name": "Card fee",
                "currency": "KES",
                "amount": 100,
                "chargeAppliesTo": "CLIENT",
                "chargeTimeType": "SPECIFIED_DUE_DATE",
                "incomeAccount": "Fee Income"
            }),
        ),
    ];
    let remote = FakeRemote::new();

    let summary = load(&remote, &entities);

    assert!(!summary.has_failures(), "{:#?}", summary.failures().collect::<Vec<_>>());
    let fee_income = remote
        .entities("glaccounts")
        .into_iter()
        .find(|a| a["glCode"] == json!("4100"))
        .unwrap();
    assert_eq!(remote.entities("charges")[0]["incomeAccountId"], fee_income["id"]);
}

#[test]
fn test_activity_mapping_waits_for_account_named_by_name() {
    let entities = vec![
        entity(
            "FinancialActivityMapping",
            "cash-at-teller",
            "financial-activity-mappings/cash-at-teller.yaml",
            json!({ "financialActivityName": "Cash at Teller", "glAccountCode": "Teller Cash" }),
        ),
        entity(
            "GLAccount",
            "cash",
            "chart-of-accounts/cash.yaml",
            json!({ "name": "Cash", "glCode": "1100", "type": "ASSET", "usage": "HEADER" }),
        ),
        entity(
            "GLAccount",
            "teller-cash",
            "chart-of-accounts/teller-cash.yaml",
            json!({ "name": "Teller Cash", "glCode": "1110", "type": "ASSET", "parentGLCode": "Cash" }),
        ),
    ];
    let remote = FakeRemote::new();

    let summary = load(&remote, &entities);

    assert!(!summary.has_failures(), "{:#?}", summary.failures().collect::<Vec<_>>());
    let teller_cash = remote
        .entities("glaccounts")
        .into_iter()
        .find(|a| a["glCode"] == json!("1110"))
        .unwrap();
    let mapping = &remote.entities("financialactivityaccounts")[0];
    assert_eq!(mapping["financialActivityId"], json!(102));
    assert_eq!(mapping["glAccountId"], teller_cash["id"]);
}

#[rstest]
#[case::same_account("1100", false)]
#[case::other_account("1200", true)]
fn test_existing_activity_mapping(#[case] declared_code: &str, #[case] updates: bool) {
    let remote = FakeRemote::new();
    let cash = remote.seed("glaccounts", json!({ "name": "Cash", "glCode": "1100" }));
    let vault = remote.seed("glaccounts", json!({ "name": "Vault", "glCode": "1200" }));
    let id = remote.seed(
        "financialactivityaccounts",
        json!({
            "financialActivityData": { "id": 101, "name": "Cash at Mainvault", "mappedGLAccountType": "ASSET" },
            "glAccountData": { "id": cash, "name": "Cash", "glCode": "1100" }
        }),
    );
    let mapping = entity(
        "FinancialActivityMapping",
        "mainvault",
        "financial-activity-mappings/mainvault.yaml",
        json!({ "financialActivityName": "Cash at Mainvault", "glAccountCode": declared_code }),
    );

    let summary = load(&remote, &[mapping]);
    let outcome = &summary.result("FinancialActivityMapping", "Cash at Mainvault").unwrap().outcome;

    if updates {
        match outcome {
            Outcome::Updated { fields, .. } => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "glAccountId");
                assert_eq!(fields[0].declared, json!(vault));
            }
            other => panic!("expected an update, got {other:?}"),
        }
    } else {
        assert_eq!(*outcome, Outcome::SkippedUnchanged { id });
    }
    assert_eq!(remote.posts(), 0);
}

fn seeded_late_fee(remote: &FakeRemote, amount: f64) -> i64 {
    remote.seed(
        "charges",
        json!({
            "name": "Late fee",
            "currency": { "code": "KES", "name": "Kenyan Shilling" },
            "amount": amount,
            "chargeAppliesTo": { "id": 1, "code": "chargeAppliesTo.loan", "value": "Loan" },
            "chargeTimeType": { "id": 9, "code": "chargeTimeType.overdueInstallment" },
            "chargeCalculationType": { "id": 1, "code": "chargeCalculationType.flat" },
            "chargePaymentMode": { "id": 0, "code": "chargepaymentmode.regular" },
            "active": true,
            "penalty": true
        }),
    )
}

fn late_fee(amount: Value) -> DeclaredEntity {
    entity(
        "Charge",
        "late-fee",
        "charges/late-fee.yaml",
        json!({
            "name": "Late fee",
            "currency": "KES",
            "amount": amount,
            "chargeTimeType": "OVERDUE_INSTALLMENT",
            "penalty": true
        }),
    )
}

#[rstest]
#[case::within_tolerance(json!(15.00), 15.0001, false)]
#[case::string_amount(json!("15.00"), 15.00002, false)]
#[case::beyond_tolerance(json!(15.00), 15.5, true)]
fn test_amount_diff_tolerance(#[case] declared: Value, #[case] remote_amount: f64, #[case] updates: bool) {
    let remote = FakeRemote::new();
    let id = seeded_late_fee(&remote, remote_amount);

    let summary = load(&remote, &[late_fee(declared)]);
    let outcome = &summary.result("Charge", "Late fee").unwrap().outcome;

    if updates {
        match outcome {
            Outcome::Updated { id: updated, fields, .. } => {
                assert_eq!(*updated, id);
                let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["amount"]);
            }
            other => panic!("expected an update, got {other:?}"),
        }
        assert_eq!(remote.puts(), 1);
    } else {
        assert_eq!(*outcome, Outcome::SkippedUnchanged { id });
        assert_eq!(remote.puts(), 0);
    }
}

fn seeded_boda_loan(remote: &FakeRemote, rate: f64) -> i64 {
    let fee = remote.seed("charges", json!({ "name": "Processing Fee", "amount": 500.0 }));
    remote.seed(
        "loanproducts",
        json!({
            "name": "Boda Boda Loan",
            "shortName": "BBL",
            "currency": { "code": "KES", "name": "Kenyan Shilling", "decimalPlaces": 2, "inMultiplesOf": 0 },
            "principal": 50000.0,
            "minPrincipal": 10000.0,
            "maxPrincipal": 100000.0,
            "numberOfRepayments": 12,
            "minNumberOfRepayments": 3,
            "maxNumberOfRepayments": 24,
            "repaymentEvery": 1,
            "repaymentFrequencyType": { "id": 2, "code": "repaymentFrequency.periodFrequencyType.months", "value": "Months" },
            "interestRatePerPeriod": rate,
            "minInterestRatePerPeriod": 1.0,
            "maxInterestRatePerPeriod": 5.0,
            "interestType": { "id": 1, "code": "interestType.declining.balance" },
            "interestCalculationPeriodType": { "id": 1, "code": "interestCalculationPeriodType.same.as.repayment.period" },
            "amortizationType": { "id": 1, "code": "amortizationType.equal.installments" },
            "allowPartialPeriodInterestCalcualtion": true,
            "isInterestRecalculationEnabled": false,
            "multiDisburseLoan": false,
            "transactionProcessingStrategyCode": "mifos-standard-strategy",
            "charges": [{ "id": fee, "name": "Processing Fee", "amount": 500.0 }],
            "accountingRule": { "id": 1, "code": "accountingRuleType.none", "value": "NONE" }
        }),
    )
}

fn boda_loan() -> DeclaredEntity {
    entity(
        "LoanProduct",
        "boda-boda",
        "loan-products/boda-boda.yaml",
        json!({
            "name": "Boda Boda Loan",
            "shortName": "BBL",
            "currency": "KES",
            "principal": { "default": 50000, "min": 10000, "max": 100000 },
            "interestRate": { "default": 2.5, "min": 1, "max": 5 },
            "numberOfRepayments": { "default": 12, "min": 3, "max": 24 },
            "repaymentFrequency": "Months",
            "charges": ["Processing Fee"]
        }),
    )
}

#[rstest]
#[case::same_terms(2.5, false)]
#[case::rate_edited_remotely(3.0, true)]
fn test_loan_product_in_remote_shape(#[case] remote_rate: f64, #[case] updates: bool) {
    let remote = FakeRemote::new();
    let id = seeded_boda_loan(&remote, remote_rate);

    let summary = load(&remote, &[boda_loan()]);
    let outcome = &summary.result("LoanProduct", "Boda Boda Loan").unwrap().outcome;

    if updates {
        match outcome {
            Outcome::Updated { fields, .. } => {
                let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["interestRatePerPeriod"]);
            }
            other => panic!("expected an update, got {other:?}"),
        }
    } else {
        assert_eq!(*outcome, Outcome::SkippedUnchanged { id });
        assert_eq!(remote.puts(), 0);
    }
    assert_eq!(remote.posts(), 0);
}

#[test]
fn test_savings_product_in_remote_shape_is_unchanged() {
    let remote = FakeRemote::new();
    remote.seed("glaccounts", json!({ "name": "Savings Reference", "glCode": "1300" }));
    remote.seed("glaccounts", json!({ "name": "Savings Control", "glCode": "2100" }));
    let id = remote.seed(
        "savingsproducts",
        json!({
            "name": "Jijenge Savings",
            "shortName": "JJS",
            "description": "Passbook savings",
            "currency": { "code": "KES", "decimalPlaces": 2, "inMultiplesOf": 0 },
            "nominalAnnualInterestRate": 4.0,
            "minRequiredOpeningBalance": 1000.0,
            "interestCompoundingPeriodType": { "id": 4, "code": "savings.interest.period.savingsCompoundingInterestPeriodType.monthly" },
            "interestPostingPeriodType": { "id": 5, "code": "savings.interest.posting.period.quarterly" },
            "interestCalculationType": { "id": 1, "code": "savingsInterestCalculationType.dailybalance" },
            "interestCalculationDaysInYearType": { "id": 365, "code": "savingsInterestCalculationDaysInYearType.days365" },
            "withdrawalFeeForTransfers": false,
            "allowOverdraft": false,
            "enforceMinRequiredBalance": false,
            "withHoldTax": false,
            "isDormancyTrackingActive": false,
            "accountingRule": { "id": 2, "code": "accountingRuleType.cash", "value": "CASH" },
            "accountingMappings": {
                "savingsReferenceAccount": { "id": 1, "glCode": "1300" },
                "savingsControlAccount": { "id": 2, "glCode": "2100" }
            }
        }),
    );
    let savings = entity(
        "SavingsProduct",
        "jijenge",
        "savings-products/jijenge.yaml",
        json!({
            "name": "Jijenge Savings",
            "shortName": "JJS",
            "description": "Passbook savings",
            "currency": "KES",
            "interestRate": 4,
            "minRequiredOpeningBalance": "1000",
            "interestPostingPeriod": "Quarterly",
            "accounting": {
                "type": "Cash",
                "savingsReference": "1300",
                "savingsControl": "Savings Control"
            }
        }),
    );

    let summary = load(&remote, &[savings]);

    assert_eq!(
        summary.result("SavingsProduct", "Jijenge Savings").unwrap().outcome,
        Outcome::SkippedUnchanged { id }
    );
    assert_eq!(remote.posts() + remote.puts(), 0);
}
