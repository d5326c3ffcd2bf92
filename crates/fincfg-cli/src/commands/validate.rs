//! The validate command

use colored::Colorize;

use fincfg_core::validate;

use crate::commands::{ExitStatus, print_json};
use crate::context::RunContext;
use crate::error::Result;

/// Parse and schema-check the corpus; never touches the network
pub fn run_validate(ctx: &RunContext) -> Result<ExitStatus> {
    let corpus = ctx.corpus()?;
    let validation = validate(&corpus, &ctx.kinds);

    if ctx.json {
        print_json(&validation)?;
        return Ok(ExitStatus::from_findings(!validation.is_clean()));
    }

    println!(
        "{} Validating {}",
        "=>".blue().bold(),
        ctx.declared_dir.display()
    );
    for failure in &validation.failures {
        println!(
            "   {} {} '{}' ({}): {}",
            "!".red(),
            failure.kind,
            failure.key.cyan(),
            failure.source.display().to_string().dimmed(),
            failure.outcome
        );
    }
    for doc in &validation.ignored {
        println!(
            "   {} {} '{}' ({}): unknown kind, ignored",
            "-".yellow(),
            doc.kind,
            doc.name,
            doc.source.display().to_string().dimmed()
        );
    }

    if validation.is_clean() {
        println!("{} {} entities valid.", "OK".green().bold(), validation.valid);
    } else {
        println!(
            "{} {} invalid, {} valid.",
            "FAILED".red().bold(),
            validation.failures.len(),
            validation.valid
        );
    }
    Ok(ExitStatus::from_findings(!validation.is_clean()))
}
