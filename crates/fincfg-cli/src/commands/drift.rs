//! The drift command

use colored::Colorize;

use fincfg_alert::AlertDispatcher;
use fincfg_core::{DriftDetector, DriftReport};

use crate::commands::{ExitStatus, print_json};
use crate::context::RunContext;
use crate::error::Result;

/// Detect drift, print the report, and alert when anything drifted.
///
/// `kinds` from the command line take precedence over `[drift] kinds`.
pub fn run_drift(ctx: &RunContext, kinds: &[String]) -> Result<ExitStatus> {
    let corpus = ctx.corpus()?;
    let client = ctx.client()?;
    let selected: &[String] = if kinds.is_empty() { &ctx.config.drift.kinds } else { kinds };

    if !ctx.json {
        println!("{} Checking for configuration drift...", "=>".blue().bold());
    }
    let report = DriftDetector::new(&client, &ctx.kinds, &corpus).detect(selected)?;

    if ctx.json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if report.has_drift() {
        if ctx.dry_run {
            tracing::info!("[dry-run] Would send drift alerts");
        } else {
            send_alerts(ctx, &report);
        }
    }

    Ok(ExitStatus::from_findings(report.has_drift() || report.has_errors()))
}

fn send_alerts(ctx: &RunContext, report: &DriftReport) {
    let dispatcher = AlertDispatcher::from_config(&ctx.config.alerts);
    if dispatcher.is_empty() {
        tracing::info!("No alert sinks configured");
        return;
    }
    for delivery in dispatcher.dispatch(report) {
        if delivery.is_ok() {
            tracing::info!("Alert delivered via {}", delivery.sink);
        }
    }
}

fn print_report(report: &DriftReport) {
    println!();
    println!("{}", report.format_text());
    println!();
    if report.has_drift() {
        println!(
            "{} {} finding(s) across {} kind(s)",
            "DRIFTED".red().bold(),
            report.findings.len(),
            report.kinds_checked.len()
        );
    } else if report.has_errors() {
        println!(
            "{} {} kind(s) could not be checked",
            "FAILED".red().bold(),
            report.errors.len()
        );
    } else {
        println!("{} No drift detected.", "OK".green().bold());
    }
}
