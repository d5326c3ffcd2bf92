//! The kinds command

use colored::Colorize;
use serde_json::json;

use crate::commands::{ExitStatus, print_json};
use crate::context::RunContext;
use crate::error::Result;

/// List the kind table in load order
pub fn run_kinds(ctx: &RunContext) -> Result<ExitStatus> {
    if ctx.json {
        let kinds: Vec<_> = ctx
            .kinds
            .iter()
            .map(|k| {
                json!({
                    "kind": k.kind,
                    "directory": k.directory,
                    "endpoint": k.endpoint,
                    "key": k.identity.declared,
                })
            })
            .collect();
        print_json(&kinds)?;
        return Ok(ExitStatus::Clean);
    }

    println!("{} Supported kinds (load order):", "=>".blue().bold());
    for (position, k) in ctx.kinds.iter().enumerate() {
        println!(
            "   {:>2}. {} {:<20} {} key: {}",
            position + 1,
            format!("{:<16}", k.kind).cyan(),
            k.directory,
            format!("{:<18}", k.endpoint).dimmed(),
            k.identity.declared
        );
    }
    Ok(ExitStatus::Clean)
}
