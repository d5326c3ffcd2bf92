//! The apply command

use colored::Colorize;

use fincfg_core::{EntityResult, Loader, Outcome, Summary};

use crate::commands::{ExitStatus, print_json};
use crate::context::RunContext;
use crate::error::Result;

/// Reconcile the declared corpus against the remote
pub fn run_apply(ctx: &RunContext) -> Result<ExitStatus> {
    let corpus = ctx.corpus()?;
    let client = ctx.client()?;

    if !ctx.json {
        println!(
            "{} Applying {} declared entit{} from {}{}",
            "=>".blue().bold(),
            corpus.len(),
            if corpus.len() == 1 { "y" } else { "ies" },
            ctx.declared_dir.display(),
            if ctx.dry_run { " (dry run)".yellow().to_string() } else { String::new() }
        );
    }

    let mut loader = Loader::new(&client, &ctx.kinds, ctx.config.loader_options(ctx.dry_run));
    let summary = loader.load_corpus(&corpus)?;

    if ctx.json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }
    Ok(ExitStatus::from_findings(summary.has_failures()))
}

fn print_summary(summary: &Summary) {
    let mut current_kind: Option<&str> = None;
    for result in &summary.results {
        if current_kind != Some(result.kind.as_str()) {
            println!();
            println!("{}", result.kind.bold());
            current_kind = Some(result.kind.as_str());
        }
        print_result(result);
    }

    if !summary.ignored.is_empty() {
        println!();
        println!("{} Ignored (unknown kind):", "SKIPPED".yellow().bold());
        for doc in &summary.ignored {
            println!(
                "   {} {} '{}' ({})",
                "-".yellow(),
                doc.kind,
                doc.name,
                doc.source.display().to_string().dimmed()
            );
        }
    }

    println!();
    println!("{} Summary by kind:", "=>".blue().bold());
    for (kind, counts) in summary.by_kind() {
        println!(
            "   {:<26} {} created, {} updated, {} unchanged, {} failed",
            kind, counts.created, counts.updated, counts.unchanged, counts.failed
        );
    }

    let counts = summary.counts();
    println!();
    if summary.has_failures() {
        println!(
            "{} {} of {} entities failed after {} pass(es) (success rate {:.1}%)",
            "FAILED".red().bold(),
            counts.failed,
            counts.total(),
            summary.passes,
            summary.success_rate()
        );
    } else {
        println!(
            "{} {} entities reconciled in {} pass(es) (success rate {:.1}%)",
            "OK".green().bold(),
            counts.total(),
            summary.passes,
            summary.success_rate()
        );
    }
    println!("   run id: {}", summary.run_id.to_string().dimmed());
}

fn print_result(result: &EntityResult) {
    let marker = match &result.outcome {
        Outcome::Created { .. } => "+".green(),
        Outcome::Updated { .. } => "~".yellow(),
        Outcome::SkippedUnchanged { .. } => "=".dimmed(),
        Outcome::Deferred { .. } | Outcome::Failed { .. } => "!".red(),
    };
    println!(
        "   {} {}: {} ({})",
        marker,
        result.key.cyan(),
        result.outcome,
        result.source.display().to_string().dimmed()
    );
}
