//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// fincfg - Reconcile declared core-banking configuration with a live tenant
#[derive(Parser, Debug)]
#[command(name = "fincfg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./fincfg.toml when present)
    #[arg(long, global = true, env = "FINCFG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the declared document tree
    #[arg(long, global = true, env = "FINCFG_DECLARED_DIR", default_value = "declared")]
    pub declared_dir: PathBuf,

    /// Admin API base URL, e.g. https://core.example.org/fineract-provider/api/v1
    #[arg(long, global = true, env = "FINERACT_URL")]
    pub remote_url: Option<String>,

    /// Tenant identifier
    #[arg(long, global = true, env = "FINERACT_TENANT")]
    pub tenant: Option<String>,

    /// Report what would change without writing or alerting
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create or update remote entities to match the declared corpus
    ///
    /// Examples:
    ///   fincfg apply --dry-run
    ///   fincfg --declared-dir config/ apply
    Apply,

    /// Compare the declared corpus with remote state and alert on drift
    ///
    /// Examples:
    ///   fincfg drift
    ///   fincfg drift --kind Office --kind LoanProduct --json
    Drift {
        /// Restrict the check to one kind (repeatable)
        #[arg(long = "kind", value_name = "KIND")]
        kinds: Vec<String>,
    },

    /// Parse and schema-check the corpus without contacting the remote
    Validate,

    /// List the supported entity kinds in load order
    Kinds,
}
