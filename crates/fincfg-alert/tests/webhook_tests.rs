//! Webhook delivery against a mock server.

use chrono::Utc;
use fincfg_alert::{AlertDispatcher, AlertError, AlertSink, WebhookSink};
use fincfg_core::{AlertsConfig, DriftReport, WebhookConfig};
use httpmock::prelude::*;
use pretty_assertions::assert_eq;

fn report() -> DriftReport {
    DriftReport {
        detected_at: Utc::now(),
        kinds_checked: vec!["Office".into(), "Role".into()],
        findings: Vec::new(),
        errors: Vec::new(),
    }
}

fn sink(server: &MockServer) -> WebhookSink {
    WebhookSink::new(&WebhookConfig {
        url: server.url("/services/T000/B000"),
    })
    .unwrap()
}

#[test]
fn test_posts_json_once() {
    let server = MockServer::start();
    let hook = server.mock(|when, then| {
        when.method(POST)
            .path("/services/T000/B000")
            .header("content-type", "application/json");
        then.status(200).body("ok");
    });

    sink(&server).send(&report()).unwrap();

    hook.assert_calls(1);
}

#[test]
fn test_rejected_post_is_an_error() {
    let server = MockServer::start();
    let hook = server.mock(|when, then| {
        when.method(POST).path("/services/T000/B000");
        then.status(404).body("no_service");
    });

    let err = sink(&server).send(&report()).unwrap_err();

    hook.assert_calls(1);
    assert!(matches!(err, AlertError::Http(_)));
}

#[test]
fn test_dispatch_reports_failure_without_panicking() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(500);
    });
    let config = AlertsConfig {
        webhook: Some(WebhookConfig {
            url: server.url("/hook"),
        }),
        email: None,
    };

    let deliveries = AlertDispatcher::from_config(&config).dispatch(&report());

    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].sink, "webhook");
    assert!(!deliveries[0].is_ok());
}
