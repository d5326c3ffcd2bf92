//! SMTP email alerts

use std::time::Duration;

use chrono::{DateTime, Utc};
use fincfg_core::{DriftReport, EmailConfig};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::sink::{ALERT_TITLE, AlertSink};
use crate::{AlertError, Result};

const TIMEOUT: Duration = Duration::from_secs(30);

/// Sends the report as a plain-text and HTML alternative message
pub struct EmailSink {
    config: EmailConfig,
}

impl EmailSink {
    /// # Errors
    ///
    /// Returns [`AlertError::Config`] unless host, sender and at least one
    /// recipient are set.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        if !config.is_complete() {
            return Err(AlertError::config("email", "host, from and to are required"));
        }
        Ok(Self {
            config: config.clone(),
        })
    }

    /// Build the message without sending it.
    ///
    /// # Errors
    ///
    /// Returns an error if an address does not parse.
    pub fn build_message(&self, report: &DriftReport, sent_at: DateTime<Utc>) -> Result<Message> {
        let mut builder = Message::builder()
            .from(mailbox(&self.config.from)?)
            .subject(self.config.subject.clone());
        for recipient in &self.config.to {
            builder = builder.to(mailbox(recipient)?);
        }

        let text = report.format_text();
        let html = html_body(&text, sent_at);
        Ok(builder.multipart(MultiPart::alternative_plain_html(text, html))?)
    }

    fn transport(&self) -> Result<SmtpTransport> {
        // use_tls selects STARTTLS on a plain connection; otherwise the
        // connection is TLS from the first byte.
        let builder = if self.config.use_tls {
            SmtpTransport::starttls_relay(&self.config.host)?
        } else {
            SmtpTransport::relay(&self.config.host)?
        };
        let mut builder = builder.port(self.config.port).timeout(Some(TIMEOUT));
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(builder.build())
    }
}

impl AlertSink for EmailSink {
    fn name(&self) -> &'static str {
        "email"
    }

    fn send(&self, report: &DriftReport) -> Result<()> {
        let message = self.build_message(report, Utc::now())?;
        self.transport()?.send(&message)?;
        tracing::info!(
            "Email alert sent to {} recipient(s)",
            self.config.to.len()
        );
        Ok(())
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address.trim().parse().map_err(|source| AlertError::Address {
        address: address.to_string(),
        source,
    })
}

fn html_body(report: &str, sent_at: DateTime<Utc>) -> String {
    format!(
        "<html>\n  <body>\n    <h2 style=\"color: #ff9800;\">{title}</h2>\n    \
         <pre style=\"background-color: #f5f5f5; padding: 15px; border-left: 4px solid #ff9800;\">{report}</pre>\n    \
         <hr>\n    <p style=\"color: #666; font-size: 12px;\">\n      \
         This alert was generated by fincfg drift detection.<br>\n      \
         Detection Time: {time}\n    </p>\n  </body>\n</html>\n",
        title = ALERT_TITLE,
        report = escape_html(report),
        time = sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
