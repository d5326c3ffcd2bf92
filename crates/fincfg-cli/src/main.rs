//! fincfg CLI
//!
//! Reconciles a directory of declared core-banking configuration with a
//! live tenant, and reports drift between the two.
//!
//! Exit status: `0` clean, `1` the run finished with failures, invalid
//! documents or drift, `2` the run could not complete.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use cli::{Cli, Commands};
use commands::ExitStatus;
use context::RunContext;
use error::Result;

const FATAL_EXIT: i32 = 2;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(status) => status.code(),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            FATAL_EXIT
        }
    };
    std::process::exit(code);
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
///
/// `-v` forces debug; otherwise `RUST_LOG` applies, defaulting to info.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<ExitStatus> {
    let cwd = std::env::current_dir()?;
    let ctx = RunContext::from_cli(&cli, &cwd)?;

    match cli.command {
        Commands::Apply => commands::run_apply(&ctx),
        Commands::Drift { kinds } => commands::run_drift(&ctx, &kinds),
        Commands::Validate => commands::run_validate(&ctx),
        Commands::Kinds => commands::run_kinds(&ctx),
    }
}
