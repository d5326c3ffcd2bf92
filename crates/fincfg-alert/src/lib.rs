//! Drift alert delivery
//!
//! A [`DriftReport`](fincfg_core::DriftReport) is fanned out to every
//! configured [`AlertSink`]:
//!
//! - **[`WebhookSink`]**: Slack-compatible incoming webhook
//! - **[`EmailSink`]**: SMTP with a plain-text and HTML body
//!
//! Delivery is best effort. [`AlertDispatcher::dispatch`] reports what
//! happened per sink and never fails the caller.

pub mod dispatch;
pub mod email;
pub mod error;
pub mod sink;
pub mod webhook;

pub use dispatch::{AlertDispatcher, Delivery};
pub use email::EmailSink;
pub use error::{AlertError, Result};
pub use sink::{ALERT_TITLE, AlertSink};
pub use webhook::{WebhookSink, slack_payload};
