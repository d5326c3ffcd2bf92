//! End-to-end tests that invoke the compiled `fincfg` binary.

use assert_cmd::Command;
use fincfg_test_utils::TestCorpus;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};

const ENV_VARS: &[&str] = &[
    "FINCFG_CONFIG",
    "FINCFG_DECLARED_DIR",
    "FINERACT_URL",
    "FINERACT_TENANT",
    "CLIENT_ID",
    "CLIENT_SECRET",
    "TOKEN_URL",
    "SLACK_WEBHOOK_URL",
    "SMTP_HOST",
    "RUST_LOG",
];

/// `fincfg` running in `dir` with a scrubbed environment
fn fincfg(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("fincfg").unwrap();
    cmd.current_dir(dir);
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("USERNAME", "mifos").env("PASSWORD", "password");
    cmd
}

fn teller_corpus() -> TestCorpus {
    let corpus = TestCorpus::new();
    corpus.add(
        "declared/roles/teller.yaml",
        "Role",
        "teller",
        json!({ "name": "Teller", "description": "Front desk" }),
    );
    corpus
}

#[test]
fn test_help_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    fincfg(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("drift"));
}

#[test]
fn test_kinds_lists_table_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let output = fincfg(dir.path()).args(["kinds", "--json"]).output().unwrap();
    assert!(output.status.success());

    let kinds: Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = kinds
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["kind"].as_str().unwrap())
        .collect();
    assert_eq!(names.first(), Some(&"Office"));
    assert_eq!(names.len(), 9);
}

#[test]
fn test_validate_clean_corpus() {
    let corpus = teller_corpus();
    fincfg(corpus.root())
        .arg("validate")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("1 entities valid"));
}

#[test]
fn test_validate_invalid_document_exits_one() {
    let corpus = teller_corpus();
    corpus.add(
        "declared/chart-of-accounts/cash.yaml",
        "GLAccount",
        "cash",
        json!({ "name": "Cash" }),
    );
    fincfg(corpus.root())
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILED"));
}

#[test]
fn test_missing_declared_dir_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    fincfg(dir.path())
        .args(["--declared-dir", "missing", "validate"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Declared directory not found"));
}

#[test]
fn test_apply_without_remote_url_exits_two() {
    let corpus = teller_corpus();
    fincfg(corpus.root())
        .arg("apply")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("remote URL is not set"));
}

#[test]
fn test_apply_creates_missing_role() {
    let server = MockServer::start();
    let lookup = server.mock(|when, then| {
        when.method(GET).path("/api/v1/roles");
        then.status(200).json_body(json!([]));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/api/v1/roles");
        then.status(200).json_body(json!({ "resourceId": 5 }));
    });
    let corpus = teller_corpus();

    fincfg(corpus.root())
        .args(["--remote-url", &server.url("/api/v1"), "apply"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("created (ID: 5)"));

    lookup.assert_calls(1);
    create.assert_calls(1);
}

#[test]
fn test_apply_exits_one_when_an_entity_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/roles");
        then.status(200).json_body(json!([]));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/api/v1/roles");
        then.status(400).json_body(json!({
            "developerMessage": "The request was invalid.",
            "errors": [{ "parameterName": "name", "defaultUserMessage": "Role name already taken" }]
        }));
    });
    let corpus = teller_corpus();

    fincfg(corpus.root())
        .args(["--remote-url", &server.url("/api/v1"), "apply"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILED"));

    create.assert_calls(1);
}

#[test]
fn test_apply_dry_run_never_posts() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/roles");
        then.status(200).json_body(json!([]));
    });
    let create = server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(json!({ "resourceId": 1 }));
    });
    let corpus = teller_corpus();

    fincfg(corpus.root())
        .args(["--remote-url", &server.url("/api/v1"), "--dry-run", "apply"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("would create"));

    create.assert_calls(0);
}

#[test]
fn test_drift_reports_mismatch_as_json() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/roles");
        then.status(200)
            .json_body(json!([{ "id": 1, "name": "Teller", "description": "Changed", "disabled": false }]));
    });
    let corpus = teller_corpus();

    let output = fincfg(corpus.root())
        .args(["--remote-url", &server.url("/api/v1"), "--json", "drift", "--kind", "Role"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["findings"][0]["driftType"], json!("field-mismatch"));
    assert_eq!(report["findings"][0]["field"], json!("description"));
}

#[test]
fn test_drift_unknown_kind_exits_two() {
    let server = MockServer::start();
    let corpus = teller_corpus();
    fincfg(corpus.root())
        .args(["--remote-url", &server.url("/api/v1"), "drift", "--kind", "Widget"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown entity kind: Widget"));
}
