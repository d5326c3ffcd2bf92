//! The delivery seam

use fincfg_core::DriftReport;

use crate::Result;

/// Title shared by every alert channel
pub const ALERT_TITLE: &str = "Fineract Configuration Drift Detected";

/// One channel a drift report can be delivered through
pub trait AlertSink {
    /// Short channel name used in logs, e.g. `webhook`
    fn name(&self) -> &'static str;

    /// Deliver the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or the channel
    /// rejects it. Callers treat this as non-fatal.
    fn send(&self, report: &DriftReport) -> Result<()>;
}
