//! Drift detection against an in-memory remote

use fincfg_core::{DriftDetector, DriftType, KindTable, Loader, LoaderOptions};
use fincfg_docs::{Corpus, DeclaredEntity};
use fincfg_test_utils::FakeRemote;
use fincfg_transport::Remote;
use pretty_assertions::assert_eq;
use serde_json::json;

fn office(name: &str) -> DeclaredEntity {
    DeclaredEntity::new("Office", name.to_lowercase(), json!({ "name": name }))
        .with_source(format!("offices/{}.yaml", name.to_lowercase()))
}

fn findings(report: &fincfg_core::DriftReport) -> Vec<(String, DriftType)> {
    report
        .findings
        .iter()
        .map(|f| (f.name.clone(), f.drift_type))
        .collect()
}

#[test]
fn test_symmetric_difference() {
    let corpus = Corpus::from_entities(vec![office("X"), office("Y")]);
    let remote = FakeRemote::new();
    remote.seed("offices", json!({ "name": "Y" }));
    remote.seed("offices", json!({ "name": "Z" }));
    let kinds = KindTable::builtin();

    let report = DriftDetector::new(&remote, &kinds, &corpus)
        .detect(&["Office".to_string()])
        .unwrap();

    assert_eq!(
        findings(&report),
        vec![
            ("X".to_string(), DriftType::MissingInRemote),
            ("Z".to_string(), DriftType::MissingInDeclaration),
        ]
    );
    let x = &report.findings[0];
    assert_eq!(x.source_ref.as_deref(), Some("offices/x.yaml"));
}

#[test]
fn test_one_failed_listing_does_not_hide_other_kinds() {
    let corpus = Corpus::from_entities(vec![
        office("Head Office"),
        DeclaredEntity::new("Role", "teller", json!({ "name": "Teller" })),
    ]);
    let remote = FakeRemote::new();
    remote.fail_path("offices", 503);
    let kinds = KindTable::builtin();

    let report = DriftDetector::new(&remote, &kinds, &corpus)
        .detect(&["Office".to_string(), "Role".to_string()])
        .unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, "Office");
    assert_eq!(report.kinds_checked, vec!["Role".to_string()]);
    assert_eq!(findings(&report), vec![("Teller".to_string(), DriftType::MissingInRemote)]);
}

#[test]
fn test_manual_edit_after_load_is_reported() {
    let corpus = Corpus::from_entities(vec![
        DeclaredEntity::new(
            "GLAccount",
            "fees",
            json!({ "name": "Fee Income", "glCode": "4100", "type": "INCOME", "manualEntriesAllowed": false }),
        ),
        DeclaredEntity::new("Role", "teller", json!({ "name": "Teller", "description": "Front desk" })),
    ]);
    let remote = FakeRemote::new();
    let kinds = KindTable::builtin();
    Loader::new(&remote, &kinds, LoaderOptions::default())
        .load_corpus(&corpus)
        .unwrap();

    let clean = DriftDetector::new(&remote, &kinds, &corpus).detect(&[]).unwrap();
    assert!(!clean.has_drift(), "{}", clean.format_text());
    assert_eq!(clean.kinds_checked.len(), kinds.names().len());

    remote.put("glaccounts/1", &json!({ "type": 5, "manualEntriesAllowed": true })).unwrap();

    let report = DriftDetector::new(&remote, &kinds, &corpus).detect(&[]).unwrap();
    let fields: Vec<Option<String>> = report.findings.iter().map(|f| f.field.clone()).collect();
    assert_eq!(
        fields,
        vec![Some("type".to_string()), Some("manualEntriesAllowed".to_string())]
    );
    assert!(report.format_text().contains("GLACCOUNT (2 issues):"));
}

#[test]
fn test_activity_mapping_compared_by_account_code() {
    let corpus = Corpus::from_entities(vec![DeclaredEntity::new(
        "FinancialActivityMapping",
        "liability-transfer",
        json!({ "financialActivityName": "Liability Transfer", "glAccountCode": "2100" }),
    )]);
    let remote = FakeRemote::new();
    remote.seed(
        "financialactivityaccounts",
        json!({
            "financialActivityData": { "id": 200, "name": "Liability Transfer" },
            "glAccountData": { "id": 4, "name": "Suspense", "glCode": "2900" }
        }),
    );
    let kinds = KindTable::builtin();

    let report = DriftDetector::new(&remote, &kinds, &corpus)
        .detect(&["FinancialActivityMapping".to_string()])
        .unwrap();

    assert_eq!(
        findings(&report),
        vec![("Liability Transfer".to_string(), DriftType::FieldMismatch)]
    );
    assert_eq!(report.findings[0].remote_value, Some(json!("2900")));
}
