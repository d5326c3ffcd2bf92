//! Fan-out of one report to every configured sink

use fincfg_core::{AlertsConfig, DriftReport};

use crate::email::EmailSink;
use crate::sink::AlertSink;
use crate::webhook::WebhookSink;

/// Result of one sink's delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub sink: &'static str,
    /// `None` on success
    pub error: Option<String>,
}

impl Delivery {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The configured sinks, in delivery order
#[derive(Default)]
pub struct AlertDispatcher {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the sinks the configuration enables.
    ///
    /// A sink whose configuration is incomplete or unusable is skipped
    /// with a warning rather than failing the run.
    pub fn from_config(config: &AlertsConfig) -> Self {
        let mut dispatcher = Self::new();

        if let Some(webhook) = &config.webhook {
            match WebhookSink::new(webhook) {
                Ok(sink) => dispatcher.push(Box::new(sink)),
                Err(e) => tracing::warn!("Webhook alerts disabled: {}", e),
            }
        }
        if let Some(email) = &config.email {
            if email.is_complete() {
                match EmailSink::new(email) {
                    Ok(sink) => dispatcher.push(Box::new(sink)),
                    Err(e) => tracing::warn!("Email alerts disabled: {}", e),
                }
            } else {
                tracing::debug!("Email not fully configured, skipping email alerts");
            }
        }

        dispatcher
    }

    pub fn push(&mut self, sink: Box<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Names of the configured sinks
    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Try every sink; a failure is logged and the rest still run.
    pub fn dispatch(&self, report: &DriftReport) -> Vec<Delivery> {
        self.sinks
            .iter()
            .map(|sink| match sink.send(report) {
                Ok(()) => Delivery {
                    sink: sink.name(),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("Failed to send {} alert: {}", sink.name(), e);
                    Delivery {
                        sink: sink.name(),
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }
}
