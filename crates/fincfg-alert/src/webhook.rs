//! Slack-compatible incoming webhooks

use std::time::Duration;

use chrono::{DateTime, Utc};
use fincfg_core::{DriftReport, WebhookConfig};
use reqwest::blocking::Client;
use serde_json::{Value, json};

use crate::sink::{ALERT_TITLE, AlertSink};
use crate::{AlertError, Result};

const TIMEOUT: Duration = Duration::from_secs(10);
const FOOTER: &str = "Fineract Drift Detection";

/// Posts the text report as a single warning attachment
pub struct WebhookSink {
    url: String,
    http: Client,
}

impl WebhookSink {
    /// # Errors
    ///
    /// Returns [`AlertError::Config`] for an empty URL, or an HTTP error if
    /// the client cannot be built.
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(AlertError::config("webhook", "url is empty"));
        }
        let http = Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            url: config.url.clone(),
            http,
        })
    }
}

/// Message body for one report
pub fn slack_payload(report: &DriftReport, sent_at: DateTime<Utc>) -> Value {
    json!({
        "text": ALERT_TITLE,
        "attachments": [{
            "color": "warning",
            "text": format!("```\n{}\n```", report.format_text()),
            "footer": FOOTER,
            "ts": sent_at.timestamp(),
        }],
    })
}

impl AlertSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn send(&self, report: &DriftReport) -> Result<()> {
        let payload = slack_payload(report, Utc::now());
        self.http
            .post(&self.url)
            .json(&payload)
            .send()?
            .error_for_status()?;
        tracing::info!("Webhook alert sent");
        Ok(())
    }
}
